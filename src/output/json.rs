//! JSON serialization of the result set

use crate::crawler::Record;
use crate::SweepError;
use std::io::Write;

/// Writes the records as a single JSON array followed by a newline
///
/// # Arguments
///
/// * `writer` - Destination, usually standard output
/// * `records` - The result set
/// * `pretty` - Indent the output
///
/// # Returns
///
/// * `Ok(())` - The array was written and flushed
/// * `Err(SweepError)` - Serialization or I/O failed
pub fn write_records<W: Write>(
    mut writer: W,
    records: &[Record],
    pretty: bool,
) -> Result<(), SweepError> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, records)?;
    } else {
        serde_json::to_writer(&mut writer, records)?;
    }

    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
