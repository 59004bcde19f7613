//! CSV export for simulation step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Fixed leading columns of the telemetry export; one `soc_<name>_kwh`
/// column per unit follows.
const FIXED_HEADER: [&str; 6] = [
    "timestep",
    "time_hr",
    "grid_charge_kwh",
    "grid_discharge_kwh",
    "loss_kwh",
    "transfers",
];

/// Exports simulation results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per step. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `results` - Complete simulation step results
/// * `unit_names` - Fleet unit names, in fleet order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], unit_names: &[String], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, unit_names, buf)
}

/// Writes simulation results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(
    results: &[StepResult],
    unit_names: &[String],
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header: Vec<String> = FIXED_HEADER.iter().map(|s| (*s).to_string()).collect();
    header.extend(unit_names.iter().map(|n| format!("soc_{n}_kwh")));
    wtr.write_record(&header)?;

    for r in results {
        let mut record = vec![
            r.timestep.to_string(),
            format!("{:.2}", r.time_hr),
            format!("{:.5}", r.grid_charge_kwh),
            format!("{:.5}", r.grid_discharge_kwh),
            format!("{:.5}", r.loss_kwh),
            r.transfers.to_string(),
        ];
        record.extend(r.soc_kwh.iter().map(|soc| format!("{soc:.5}")));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["hh_1".to_string(), "hh_2".to_string()]
    }

    fn make_step(t: usize) -> StepResult {
        StepResult {
            timestep: t,
            time_hr: t as f64 * 0.25,
            residual_kwh: vec![1.0, -1.0],
            soc_kwh: vec![0.5, 3.25],
            headroom_kwh: vec![6.5, 3.75],
            grid_charge_kwh: 0.125,
            grid_discharge_kwh: 0.0,
            loss_kwh: 0.01,
            transfers: 1,
        }
    }

    #[test]
    fn header_includes_per_unit_soc_columns() {
        let mut buf = Vec::new();
        write_csv(&[make_step(0)], &names(), &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        let first_line = output.lines().next().unwrap_or("");
        assert_eq!(
            first_line,
            "timestep,time_hr,grid_charge_kwh,grid_discharge_kwh,loss_kwh,transfers,\
             soc_hh_1_kwh,soc_hh_2_kwh"
        );
    }

    #[test]
    fn row_count_matches_step_count() {
        let results: Vec<StepResult> = (0..24).map(make_step).collect();
        let mut buf = Vec::new();
        write_csv(&results, &names(), &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        // 1 header + 24 data rows
        assert_eq!(output.lines().count(), 25);
    }

    #[test]
    fn deterministic_output() {
        let results: Vec<StepResult> = (0..5).map(make_step).collect();
        let mut buf1 = Vec::new();
        let mut buf2 = Vec::new();
        write_csv(&results, &names(), &mut buf1).unwrap();
        write_csv(&results, &names(), &mut buf2).unwrap();
        assert_eq!(buf1, buf2);
    }

    #[test]
    fn round_trip_parseable() {
        let results: Vec<StepResult> = (0..3).map(make_step).collect();
        let mut buf = Vec::new();
        write_csv(&results, &names(), &mut buf).unwrap();

        let mut rdr = csv::ReaderBuilder::new().from_reader(buf.as_slice());
        let headers = rdr.headers().cloned().unwrap();
        assert_eq!(headers.len(), 8);

        let mut row_count = 0;
        for record in rdr.records() {
            let rec = record.expect("every row should parse");
            for i in 1..rec.len() {
                let val: Result<f64, _> = rec[i].parse();
                assert!(val.is_ok(), "column {i} should parse as f64");
            }
            row_count += 1;
        }
        assert_eq!(row_count, 3);
    }
}
