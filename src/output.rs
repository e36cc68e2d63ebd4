use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::OutputDir;
use crate::perf::{JobRecord, PerfReport};
use crate::utils::prelude::*;

/// One CSV row per completed job
#[derive(Debug, Serialize)]
struct JobRow<'a> {
    name: &'a str,
    priority: i32,
    execution_ms: u64,
    arrival: String,
    started: String,
    finished: String,
    response_ms: f64,
    wait_ms: f64,
    turnaround_ms: f64,
}

impl<'a> From<&'a JobRecord> for JobRow<'a> {
    fn from(r: &'a JobRecord) -> Self {
        JobRow {
            name: &r.name,
            priority: r.priority,
            execution_ms: r.execution_duration.as_millis() as u64,
            arrival: r.arrival.to_rfc3339(),
            started: r.started.to_rfc3339(),
            finished: r.finished.to_rfc3339(),
            response_ms: r.response_ms(),
            wait_ms: r.wait_ms(),
            turnaround_ms: r.turnaround_ms(),
        }
    }
}

/// Write the per-job trace as CSV
pub fn render_job_trace<'a, J>(writer: impl io::Write, jobs: J) -> Result<()>
where
    J: IntoIterator<Item = &'a JobRecord>,
{
    let mut csv = csv::Writer::from_writer(writer);
    for job in jobs {
        csv.serialize(JobRow::from(job))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the whole report as pretty JSON
pub fn render_report(mut writer: impl io::Write, report: &PerfReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Save `<name>.json` and `<name>.csv` into `dir`, returning both paths
pub fn save_report(dir: &OutputDir, report: &PerfReport) -> Result<(PathBuf, PathBuf)> {
    let json = dir.file(format!("{}.json", report.params.name))?;
    let csv = dir.file(format!("{}.csv", report.params.name))?;

    render_report(create(&json)?, report)?;
    render_job_trace(create(&csv)?, &report.jobs)?;

    info!(json = %json.display(), csv = %csv.display(), "report saved");
    Ok((json, csv))
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}
