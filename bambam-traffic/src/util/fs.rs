use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use csv::QuoteStyle;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use crate::model::TrafficError;

/// helper function to "mkdir -p path" - make all directories along a path
pub fn create_dirs<P>(path: P) -> Result<(), TrafficError>
where
    P: AsRef<Path>,
{
    let dirspath = path.as_ref();
    if !dirspath.is_dir() {
        std::fs::create_dir_all(dirspath).map_err(|e| {
            let msg = format!(
                "error building output directory '{}': {e}",
                dirspath.to_str().unwrap_or_default()
            );
            TrafficError::ConfigurationError(msg)
        })
    } else {
        Ok(())
    }
}

pub fn is_gzip(filepath: &Path) -> bool {
    filepath
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or_default()
}

/// opens a file for reading, decompressing it on the fly when it has a .gz extension.
pub fn open_file(filepath: &Path) -> Result<Box<dyn Read>, TrafficError> {
    let f = File::open(filepath).map_err(|e| {
        TrafficError::ConfigurationError(format!(
            "failed reading {}: {}",
            filepath.to_string_lossy(),
            e
        ))
    })?;
    let r: Box<dyn Read> = if is_gzip(filepath) {
        Box::new(BufReader::new(GzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };
    Ok(r)
}

/// builds a CSV reader over a plain or gzipped file. `flexible` permits rows
/// with differing field counts, as found in wide pattern tables.
pub fn create_reader(
    filepath: &Path,
    has_headers: bool,
    flexible: bool,
) -> Result<csv::Reader<Box<dyn Read>>, TrafficError> {
    let r = open_file(filepath)?;
    let reader = csv::ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(flexible)
        .trim(csv::Trim::All)
        .from_reader(r);
    Ok(reader)
}

/// helper function to build a filewriter for writing .csv.gz files while
/// respecting the user's overwrite preferences. rows may differ in length.
///
/// # Returns
///
/// * `None` if the file exists and `overwrite` is false
pub fn create_writer(
    directory: &Path,
    filename: &str,
    has_headers: bool,
    quote_style: QuoteStyle,
    overwrite: bool,
) -> Result<Option<csv::Writer<GzEncoder<File>>>, TrafficError> {
    let filepath = directory.join(filename);
    if filepath.exists() && !overwrite {
        return Ok(None);
    }
    let file = File::create(filepath)?;
    let buffer = GzEncoder::new(file, Compression::default());
    let writer = csv::WriterBuilder::new()
        .has_headers(has_headers)
        .quote_style(quote_style)
        .flexible(true)
        .from_writer(buffer);
    Ok(Some(writer))
}
