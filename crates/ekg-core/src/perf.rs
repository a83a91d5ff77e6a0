//! Wall-clock step timing with a CSV report.
//!
//! Not a metrics system: one timer, advanced at the end of each named
//! pipeline step, written out once at the end of the run.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::info;

use crate::error::EkgResult;

#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub name: String,
    pub start: String,
    pub end: String,
    pub duration: f64,
}

/// Records elapsed wall-clock time per named pipeline step.
pub struct Performance {
    run_start: Instant,
    run_start_wall: DateTime<Local>,
    last: Instant,
    last_wall: DateTime<Local>,
    steps: Vec<Step>,
}

impl Performance {
    pub fn new() -> Self {
        let now = Instant::now();
        let wall = Local::now();
        Self {
            run_start: now,
            run_start_wall: wall,
            last: now,
            last_wall: wall,
            steps: Vec::new(),
        }
    }

    /// Close the current step under `name` and start timing the next one.
    pub fn finished_step(&mut self, name: &str) {
        let now = Instant::now();
        let wall = Local::now();
        let duration = now.duration_since(self.last).as_secs_f64();
        info!(step = name, duration_secs = format!("{duration:.2}"), "step finished");
        self.steps.push(Step {
            name: name.to_string(),
            start: self.last_wall.format("%H:%M:%S").to_string(),
            end: wall.format("%H:%M:%S").to_string(),
            duration,
        });
        self.last = now;
        self.last_wall = wall;
    }

    /// Append the run total. Call once, after the last step.
    pub fn finish(&mut self) {
        let now = Instant::now();
        let total = now.duration_since(self.run_start).as_secs_f64();
        info!(steps = self.steps.len(), total_secs = format!("{total:.2}"), "run finished");
        self.steps.push(Step {
            name: "total".to_string(),
            start: self.run_start_wall.format("%H:%M:%S").to_string(),
            end: Local::now().format("%H:%M:%S").to_string(),
            duration: total,
        });
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn total_seconds(&self) -> f64 {
        self.run_start.elapsed().as_secs_f64()
    }

    /// Write the step report as CSV (`name,start,end,duration`).
    pub fn save(&self, path: impl AsRef<Path>) -> EkgResult<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for step in &self.steps {
            writer.serialize(step)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for Performance {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_accumulate_in_order() {
        let mut perf = Performance::new();
        perf.finished_step("import");
        perf.finished_step("entities");
        perf.finish();
        let names: Vec<_> = perf.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["import", "entities", "total"]);
    }

    #[test]
    fn report_round_trips_through_csv() {
        let mut perf = Performance::new();
        perf.finished_step("clear");
        perf.finish();

        let dir = std::env::temp_dir().join("ekg-perf-test");
        let path = dir.join("report.csv");
        perf.save(&path).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "clear");
        assert_eq!(&rows[1][0], "total");
        std::fs::remove_dir_all(&dir).ok();
    }
}
