//! Label files hold one record per line, in the form produced by the
//! [`Display`](std::fmt::Display) impl of [`AnnotatedBox`]. Readers skip
//! blank lines silently and malformed lines with a warning, so a single
//! corrupt record never discards the rest of a file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::{AnnotatedBox, Error, ParseRecordError};

/// A line of a label file that could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    /// One-based line number.
    pub line_number: usize,
    /// The offending line, without its terminator.
    pub content: String,
    /// Why it was rejected.
    pub reason: ParseRecordError,
}

/// The decoded contents of a label file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelRecords {
    /// Successfully decoded boxes, in file order.
    pub boxes: Vec<AnnotatedBox>,
    /// Lines that were skipped because they did not decode.
    pub skipped: Vec<SkippedLine>,
}

impl LabelRecords {
    /// Number of malformed lines that were skipped.
    #[inline]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Decode label records from text.
pub fn parse_records(text: &str) -> LabelRecords {
    let mut records = LabelRecords::default();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<AnnotatedBox>() {
            Ok(bbox) => records.boxes.push(bbox),
            Err(reason) => {
                log::warn!("skipping label line {}: {reason}: {line:?}", i + 1);
                records.skipped.push(SkippedLine {
                    line_number: i + 1,
                    content: line.to_string(),
                    reason,
                });
            }
        }
    }
    records
}

/// Read and decode a label file.
///
/// Bytes that are not valid UTF-8 are replaced, so such a line fails to
/// decode on its own without failing the file.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<LabelRecords, Error> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let records = parse_records(&String::from_utf8_lossy(&bytes));
    log::debug!(
        "read {} boxes from {} ({} skipped)",
        records.boxes.len(),
        path.display(),
        records.skipped_count()
    );
    Ok(records)
}

/// Write boxes as label records, one per line.
pub fn write_records_to<W: Write>(boxes: &[AnnotatedBox], mut writer: W) -> std::io::Result<()> {
    for bbox in boxes {
        writeln!(writer, "{bbox}")?;
    }
    writer.flush()
}

/// Write a label file, replacing any existing content.
///
/// An empty slice produces an empty file.
pub fn write_records<P: AsRef<Path>>(boxes: &[AnnotatedBox], path: P) -> Result<(), Error> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    write_records_to(boxes, BufWriter::new(file)).map_err(|e| Error::io(path, e))?;
    log::info!("wrote {} boxes to {}", boxes.len(), path.display());
    Ok(())
}

/// Name of the label file of frame `index`, e.g. `image_000007.txt`.
pub fn label_file_name(index: usize) -> String {
    format!("image_{index:06}.txt")
}

/// Name of the rendered image of frame `index`, e.g. `image_000007.png`.
pub fn image_file_name(index: usize) -> String {
    format!("image_{index:06}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> Vec<AnnotatedBox> {
        vec![
            AnnotatedBox::new(0, 0.5, 0.5, 0.25, 0.25),
            AnnotatedBox::new(3, 0.1234567, 0.9, 0.05, 0.333333333),
            AnnotatedBox::new(1, 0.0, 1.0, 0.0, 0.0),
        ]
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(label_file_name(0));
        let boxes = sample();
        write_records(&boxes, &path).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.skipped_count(), 0);
        assert_eq!(records.boxes.len(), boxes.len());
        for (read, written) in records.boxes.iter().zip(boxes.iter()) {
            approx::assert_abs_diff_eq!(read, written, epsilon = 1e-6);
        }
    }

    #[test]
    fn written_format() {
        let mut buf = Vec::new();
        write_records_to(&[AnnotatedBox::new(2, 0.5, 0.5, 0.25, 0.25)], &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "2 0.500000 0.500000 0.250000 0.250000\n"
        );
    }

    #[test]
    fn corrupt_line_is_skipped() {
        let text = "0 0.5 0.5 0.1 0.1\n\
                    1 0.2 0.3 0.1 0.1\n\
                    this is not a record\n\
                    2 0.7 0.7 0.2 0.2\n\
                    \n\
                    4 0.9 0.1 0.05 0.05\n";
        let records = parse_records(text);
        assert_eq!(records.boxes.len(), 4);
        assert_eq!(records.skipped_count(), 1);
        let skipped = &records.skipped[0];
        assert_eq!(skipped.line_number, 3);
        assert_eq!(skipped.content, "this is not a record");
        assert!(matches!(skipped.reason, ParseRecordError::ClassIndex(_)));
        assert_eq!(
            records.boxes.iter().map(|b| b.class_idx).collect::<Vec<_>>(),
            vec![0, 1, 2, 4]
        );
    }

    #[test]
    fn invalid_utf8_only_affects_its_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.txt");
        let mut bytes = b"0 0.5 0.5 0.1 0.1\n".to_vec();
        bytes.extend_from_slice(b"1 0.5 \xff\xfe 0.1 0.1\n");
        bytes.extend_from_slice(b"2 0.5 0.5 0.1 0.1\n");
        std::fs::write(&path, bytes).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.boxes.len(), 2);
        assert_eq!(records.skipped_count(), 1);
        assert_eq!(records.skipped[0].line_number, 2);
    }

    #[test]
    fn overwrite_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        write_records(&sample(), &path).unwrap();
        write_records(&[AnnotatedBox::new(7, 0.5, 0.5, 0.1, 0.1)], &path).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.boxes.len(), 1);
        assert_eq!(records.boxes[0].class_idx, 7);

        write_records(&[], &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        match read_records(&path) {
            Err(Error::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn file_names() {
        assert_eq!(label_file_name(7), "image_000007.txt");
        assert_eq!(image_file_name(123456), "image_123456.png");
    }

    #[test]
    fn any_box_list_survives_a_write_and_read() {
        let record = (0u32..1000, 0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64);
        proptest!(|(fields in prop::collection::vec(record.clone(), 0..20))| {
            let boxes: Vec<AnnotatedBox> = fields
                .iter()
                .map(|&(c, x, y, w, h)| AnnotatedBox::new(c, x, y, w, h))
                .collect();
            let mut buf = Vec::new();
            write_records_to(&boxes, &mut buf).unwrap();
            let records = parse_records(&String::from_utf8(buf).unwrap());
            assert_eq!(records.skipped_count(), 0);
            assert_eq!(records.boxes.len(), boxes.len());
            for (read, written) in records.boxes.iter().zip(boxes.iter()) {
                assert_eq!(read.class_idx, written.class_idx);
                approx::assert_abs_diff_eq!(read, written, epsilon = 1e-6);
            }
        });
    }
}
