//! Pretty JSON dump of the compiled tables, for inspection.

use crate::model::ProcessedProject;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub fn emit(project: &ProcessedProject, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, project)?;
    writeln!(out)?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{project, test_support::compile};

    #[test]
    fn listing_names_opcodes_and_devices() {
        let session = compile("ROOM Hall;\nDEVICE LAMP Hall.Light A 1;\nPROCEDURE Main; SETDEVICE Hall.Light ON; END;");
        let value = serde_json::to_value(project(&session, 30)).unwrap();

        assert_eq!(value["devices"][0]["room"], "Hall");
        assert_eq!(value["devices"][0]["category"], "Lamp");
        let main = &value["procedures"][0];
        assert_eq!(main["name"], "Main");
        assert_eq!(main["word_count"], 7);
        assert_eq!(main["instructions"][0]["opcode"], "SetDeviceState");
        assert_eq!(main["instructions"][0]["operands"], serde_json::json!([0, 1, 0, 0, 0, 43200]));
        assert_eq!(value["calendar"][0]["date"], "2024-03-01");
    }
}
