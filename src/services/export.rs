//! Log export rendering: per-device CSV or XLSX files, ZIP bundles and the flat
//! all-devices CSV.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};
use std::io::{Cursor, Write};
use std::str::FromStr;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::database::models::{DeviceLogEntry, TimeRange};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEVICE_HEADER: [&str; 6] = ["Date and Time", "Current", "DC Bus", "Speed", "RPM", "Position"];
const ALL_DEVICES_HEADER: [&str; 7] = ["Device ID", "Time", "Current", "DC Bus", "Speed", "RPM", "Position"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("You can download logs for a maximum of {max} devices at a time ({requested} requested)")]
    TooManyDevices { max: usize, requested: usize },

    #[error("At least one device id is required")]
    NoDevices,

    #[error("Invalid device id: {0}")]
    InvalidDeviceId(String),

    #[error("{0}")]
    InvalidRange(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Caller mistakes, as opposed to rendering failures
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExportError::TooManyDevices { .. }
                | ExportError::NoDevices
                | ExportError::InvalidDeviceId(_)
                | ExportError::InvalidRange(_)
                | ExportError::UnsupportedFormat(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "xls" => Ok(ExportFormat::Xlsx),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A rendered download
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// One device's rows for a per-device file
#[derive(Debug, Clone)]
pub struct DeviceExport {
    pub tb_device_id: String,
    pub address: String,
    pub rows: Vec<DeviceLogEntry>,
}

impl DeviceExport {
    pub fn file_name(&self, format: ExportFormat) -> String {
        format!("{}_logs.{}", self.tb_device_id, format.extension())
    }

    fn title(&self) -> String {
        format!("{} | {}", self.address, self.tb_device_id)
    }
}

/// Split a comma-separated id list, dropping blanks and repeats, and enforce the
/// device limit
pub fn parse_device_ids(ids: &str, max: usize) -> Result<Vec<String>, ExportError> {
    let mut parsed: Vec<String> = Vec::new();
    for id in ids.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        // ids end up in file names and headers
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ExportError::InvalidDeviceId(id.to_string()));
        }
        if !parsed.iter().any(|seen| seen == id) {
            parsed.push(id.to_string());
        }
    }

    if parsed.is_empty() {
        return Err(ExportError::NoDevices);
    }
    if parsed.len() > max {
        return Err(ExportError::TooManyDevices {
            max,
            requested: parsed.len(),
        });
    }
    Ok(parsed)
}

/// Parse an inclusive `[from, to]` window. A bare date `to` covers that whole day.
pub fn parse_range(from: Option<&str>, to: Option<&str>) -> Result<TimeRange, ExportError> {
    let (Some(from), Some(to)) = (
        from.filter(|s| !s.trim().is_empty()),
        to.filter(|s| !s.trim().is_empty()),
    ) else {
        return Err(ExportError::InvalidRange("Missing from or to date".to_string()));
    };

    let range = TimeRange {
        from: parse_time(from, false)?,
        to: parse_time(to, true)?,
    };
    if range.from > range.to {
        return Err(ExportError::InvalidRange(format!(
            "'from' ({}) is after 'to' ({})",
            from, to
        )));
    }
    Ok(range)
}

fn parse_time(input: &str, end_of_day: bool) -> Result<DateTime<Utc>, ExportError> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, pattern) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let time = if end_of_day {
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
        } else {
            NaiveTime::from_hms_opt(0, 0, 0)
        };
        if let Some(time) = time {
            return Ok(Utc.from_utc_datetime(&date.and_time(time)));
        }
    }
    Err(ExportError::InvalidRange(format!("Invalid date: {}", input)))
}

fn signal_cells(entry: &DeviceLogEntry) -> [f64; 5] {
    let sample = &entry.sample;
    [
        sample.motor_current.unwrap_or(0.0),
        sample.bus_voltage.unwrap_or(0.0),
        sample.speed.unwrap_or(0.0),
        sample.rpm.unwrap_or(0.0),
        sample.position.unwrap_or(0.0),
    ]
}

fn inactivity_note(range: &TimeRange) -> String {
    format!(
        "No data: device was inactive between {} and {}",
        range.from.format(TIME_FORMAT),
        range.to.format(TIME_FORMAT)
    )
}

/// Render one device's file. A device with no rows gets an inactivity note instead
/// of the table.
pub fn render_device(export: &DeviceExport, format: ExportFormat, range: &TimeRange) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => render_device_csv(export, range),
        ExportFormat::Xlsx => render_device_xlsx(export, range),
    }
}

fn render_device_csv(export: &DeviceExport, range: &TimeRange) -> Result<Vec<u8>, ExportError> {
    let mut title = csv::Writer::from_writer(Vec::new());
    title.write_record([export.address.as_str(), export.tb_device_id.as_str()])?;
    let mut buf = title.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    // csv writes an empty record as `""`, so the spacer line goes in by hand
    buf.push(b'\n');

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(buf);

    if export.rows.is_empty() {
        writer.write_record([inactivity_note(range)])?;
    } else {
        writer.write_record(DEVICE_HEADER)?;
        for entry in &export.rows {
            let mut record = vec![entry.log_time.format(TIME_FORMAT).to_string()];
            record.extend(signal_cells(entry).iter().map(f64::to_string));
            writer.write_record(&record)?;
        }
    }

    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

fn render_device_xlsx(export: &DeviceExport, range: &TimeRange) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let centered = Format::new().set_align(FormatAlign::Center);
    let last_col = (DEVICE_HEADER.len() - 1) as u16;

    let sheet = workbook.add_worksheet();
    sheet.set_name("Logs")?;
    sheet.merge_range(0, 0, 0, last_col, &export.title(), &centered)?;

    let mut widths: Vec<usize> = DEVICE_HEADER.iter().map(|h| h.len().max(10)).collect();
    if export.rows.is_empty() {
        sheet.merge_range(2, 0, 2, last_col, &inactivity_note(range), &centered)?;
    } else {
        for (col, title) in DEVICE_HEADER.iter().enumerate() {
            sheet.write_string_with_format(2, col as u16, *title, &centered)?;
        }
        for (i, entry) in export.rows.iter().enumerate() {
            let row = 3 + i as u32;
            let stamp = entry.log_time.format(TIME_FORMAT).to_string();
            widths[0] = widths[0].max(stamp.len());
            sheet.write_string_with_format(row, 0, stamp, &centered)?;
            for (offset, value) in signal_cells(entry).iter().enumerate() {
                let col = offset + 1;
                widths[col] = widths[col].max(value.to_string().len());
                sheet.write_number_with_format(row, col as u16, *value, &centered)?;
            }
        }
    }
    for (col, width) in widths.iter().enumerate() {
        sheet.set_column_width(col as u16, (*width + 2) as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Bundle named files into one deflated ZIP archive
pub fn bundle_zip(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, contents) in files {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(contents)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Flat CSV of every device's rows, in the order given
pub fn render_all_csv(rows: &[DeviceLogEntry]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ALL_DEVICES_HEADER)?;
    for entry in rows {
        let mut record = vec![
            entry.tb_device_id.clone(),
            entry.log_time.format(TIME_FORMAT).to_string(),
        ];
        record.extend(signal_cells(entry).iter().map(f64::to_string));
        writer.write_record(&record)?;
    }
    writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::LogSample;
    use std::io::Read;

    fn at(s: &str) -> DateTime<Utc> {
        parse_time(s, false).unwrap()
    }

    fn entry(id: &str, when: &str, current: Option<f64>) -> DeviceLogEntry {
        DeviceLogEntry {
            id: 1,
            tb_device_id: id.to_string(),
            device_code: None,
            sample: LogSample {
                motor_current: current,
                speed: Some(1.25),
                ..Default::default()
            },
            log_time: at(when),
        }
    }

    fn range() -> TimeRange {
        parse_range(Some("2024-05-01"), Some("2024-05-02")).unwrap()
    }

    #[test]
    fn format_aliases() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("XLS".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!(matches!("pdf".parse::<ExportFormat>(), Err(ExportError::UnsupportedFormat(_))));
    }

    #[test]
    fn device_limit_is_enforced() {
        let eleven: Vec<String> = (0..11).map(|i| format!("d{i}")).collect();
        let err = parse_device_ids(&eleven.join(","), 10).unwrap_err();
        assert!(matches!(err, ExportError::TooManyDevices { max: 10, requested: 11 }));
        assert!(err.is_client_error());

        assert_eq!(parse_device_ids(" d1, d2,,d1 ", 10).unwrap(), vec!["d1", "d2"]);
        assert!(matches!(parse_device_ids(" , ", 10), Err(ExportError::NoDevices)));
    }

    #[test]
    fn device_ids_must_be_plain_tokens() {
        let err = parse_device_ids("../../etc/cron.d/x,d2", 10).unwrap_err();
        assert!(matches!(err, ExportError::InvalidDeviceId(ref id) if id == "../../etc/cron.d/x"));
        assert!(err.is_client_error());
        assert!(parse_device_ids("d1\"; x=y", 10).is_err());

        let uuid = "784f394c-42b6-435a-983c-b7beff2784f9";
        assert_eq!(parse_device_ids(uuid, 10).unwrap(), vec![uuid]);
    }

    #[test]
    fn range_parsing() {
        let r = range();
        assert_eq!(r.from, at("2024-05-01T00:00:00Z"));
        assert_eq!(r.to.format(TIME_FORMAT).to_string(), "2024-05-02 23:59:59");

        let r = parse_range(Some("2024-05-01 08:30:00"), Some("2024-05-01T09:00")).unwrap();
        assert_eq!(r.from, at("2024-05-01T08:30:00Z"));
        assert_eq!(r.to, at("2024-05-01T09:00:00Z"));

        assert!(parse_range(None, Some("2024-05-01")).is_err());
        assert!(parse_range(Some("2024-05-03"), Some("2024-05-01")).is_err());
        assert!(parse_range(Some("yesterday"), Some("2024-05-01")).is_err());
    }

    #[test]
    fn device_csv_layout() {
        let export = DeviceExport {
            tb_device_id: "d1".into(),
            address: "Flat 9".into(),
            rows: vec![entry("d1", "2024-05-01 10:00:00", None)],
        };
        let csv = String::from_utf8(render_device(&export, ExportFormat::Csv, &range()).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Flat 9,d1");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Date and Time,Current,DC Bus,Speed,RPM,Position");
        assert_eq!(lines[3], "2024-05-01 10:00:00,0,0,1.25,0,0");
        assert_eq!(export.file_name(ExportFormat::Csv), "d1_logs.csv");
    }

    #[test]
    fn empty_device_gets_placeholder() {
        let export = DeviceExport {
            tb_device_id: "d2".into(),
            address: "-".into(),
            rows: vec![],
        };
        let csv = String::from_utf8(render_device(&export, ExportFormat::Csv, &range()).unwrap()).unwrap();
        assert!(csv.contains("No data: device was inactive between 2024-05-01 00:00:00"));

        let xlsx = render_device(&export, ExportFormat::Xlsx, &range()).unwrap();
        assert!(xlsx.starts_with(b"PK"));
    }

    #[test]
    fn zip_holds_one_entry_per_file() {
        let files = vec![
            ("d1_logs.csv".to_string(), b"a,b\n".to_vec()),
            ("d2_logs.csv".to_string(), b"c,d\n".to_vec()),
        ];
        let bytes = bundle_zip(&files).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        let mut contents = String::new();
        archive
            .by_name("d2_logs.csv")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "c,d\n");
    }

    #[test]
    fn all_devices_csv() {
        let rows = vec![
            entry("a", "2024-05-01 10:00:00", Some(2.0)),
            entry("b", "2024-05-01 09:00:00", None),
        ];
        let csv = String::from_utf8(render_all_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Device ID,Time,Current,DC Bus,Speed,RPM,Position");
        assert_eq!(lines[1], "a,2024-05-01 10:00:00,2,0,1.25,0,0");
        assert!(lines[2].starts_with("b,"));
    }
}
