//! A single retrieval job: request, target file and working directory.

use std::path::PathBuf;

use serde::Serialize;
use viewer_common::ForecastRequest;

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalJob {
    pub dataset: String,
    pub variable: String,
    pub bbox: String,
    pub date: Option<String>,
    pub run: String,
    pub forecast_start: u32,
    pub forecast_end: Option<u32>,
    pub range_mode: bool,
    /// `{stem}.tif`
    pub output_filename: String,
    /// Session workspace the program runs in
    pub workdir: PathBuf,
    pub debug: bool,
}

impl RetrievalJob {
    pub fn new(request: &ForecastRequest, workdir: PathBuf, debug: bool) -> Self {
        Self {
            dataset: request.dataset.clone(),
            variable: request.variable.clone(),
            bbox: request.bbox.to_string(),
            date: request.date_arg(),
            run: request.run_arg(),
            forecast_start: request.forecast_start,
            forecast_end: request.forecast_end,
            range_mode: request.range_mode,
            output_filename: request.stem.output_filename(),
            workdir,
            debug,
        }
    }

    /// Command line for the retrieval program.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--dataset".to_string(),
            self.dataset.clone(),
            "--varname".to_string(),
            self.variable.clone(),
            "--bbox".to_string(),
            self.bbox.clone(),
        ];
        if let Some(date) = &self.date {
            args.push("--date".to_string());
            args.push(date.clone());
        }
        args.extend([
            "--run".to_string(),
            self.run.clone(),
            "--out".to_string(),
            self.output_filename.clone(),
            "--start_fc".to_string(),
            self.forecast_start.to_string(),
        ]);
        if let Some(end) = self.forecast_end {
            args.push("--end_fc".to_string());
            args.push(end.to_string());
        }
        if self.range_mode {
            args.push("--fc_range".to_string());
        }
        if self.debug {
            args.push("--debug".to_string());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewer_common::ParameterForm;

    #[test]
    fn test_default_form_args() {
        let request = ParameterForm::default().to_request().unwrap();
        let job = RetrievalJob::new(&request, PathBuf::from("/tmp/ws"), true);
        assert_eq!(
            job.args(),
            vec![
                "--dataset", "COSMO-2I", "--varname", "tp", "--bbox", "11.9,45,13.2,46", "--run",
                "00:00", "--out", "COSMO-2I_tp__00:00_1-None.tif", "--start_fc", "1", "--debug",
            ]
        );
    }

    #[test]
    fn test_optional_args() {
        let form = ParameterForm {
            date: "2024-03-01".to_string(),
            end_fc: "6".to_string(),
            fc_range: true,
            ..ParameterForm::default()
        };
        let job = RetrievalJob::new(&form.to_request().unwrap(), PathBuf::from("."), false);
        let args = job.args();

        let after = |flag: &str| {
            let i = args.iter().position(|a| a == flag).unwrap();
            args[i + 1].clone()
        };
        assert_eq!(after("--date"), "2024-03-01");
        assert_eq!(after("--end_fc"), "6");
        assert!(args.contains(&"--fc_range".to_string()));
        assert!(!args.contains(&"--debug".to_string()));
    }
}
