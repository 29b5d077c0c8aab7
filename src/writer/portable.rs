//! Emit the runtime's textual instruction stream.

use crate::model::ProcessedProject;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub const MAGIC: &str = "SmartCode";
pub const END_OF_SECTION: &str = "****************";

pub fn emit(project: &ProcessedProject, path: &Path) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_to(project, &mut out)?;
    out.flush()
}

pub fn write_to<W: Write>(project: &ProcessedProject, out: &mut W) -> io::Result<()> {
    let counts = project.section_counts();
    write!(out, "{MAGIC}")?;
    for count in counts {
        write!(out, " {count}")?;
    }
    writeln!(out, " {}", counts.iter().sum::<usize>())?;

    for day in &project.calendar {
        writeln!(out, "{} {} {} {}", day.epoch_seconds, day.sunrise, day.sunset, day.flags)?;
    }
    writeln!(out, "{END_OF_SECTION}")?;

    for house in &project.house_codes {
        writeln!(out, "{} {} {} {}", house.code, house.off, house.on, house.name)?;
    }
    writeln!(out, "{END_OF_SECTION}")?;

    for device in &project.devices {
        writeln!(
            out,
            "{} {} {} {} {} {} {}.{}",
            device.type_code,
            device.house_code,
            device.unit_code,
            device.off,
            device.on,
            device.hub_address,
            device.room,
            device.name
        )?;
    }
    writeln!(out, "{END_OF_SECTION}")?;

    for variable in &project.variables {
        writeln!(out, "{} {}", variable.initial, variable.name)?;
    }
    writeln!(out, "{END_OF_SECTION}")?;

    for timer in &project.timers {
        writeln!(out, "{} {}", timer.sequences.len(), timer.name)?;
        for sequence in &timer.sequences {
            writeln!(
                out,
                "{} {} {} {}",
                sequence.events.len(),
                sequence.fire_time,
                sequence.days,
                sequence.description
            )?;
            for event in &sequence.events {
                writeln!(out, "{} {}", event.procedure, event.offset)?;
            }
        }
    }
    writeln!(out, "{END_OF_SECTION}")?;

    for procedure in &project.procedures {
        let code = &procedure.code;
        writeln!(out, "{} {} {}", code.instruction_count, code.word_count, procedure.name)?;
        for instruction in &code.instructions {
            writeln!(out, "{instruction}")?;
        }
    }
    writeln!(out, "{END_OF_SECTION}")?;

    for timeout in &project.timeouts {
        writeln!(out, "{} {} {}", timeout.duration, timeout.off, timeout.name)?;
    }
    writeln!(out, "{END_OF_SECTION}")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{project, test_support::compile};

    fn stream(source: &str) -> Vec<String> {
        let session = compile(source);
        let mut out = Vec::new();
        write_to(&project(&session, 30), &mut out).unwrap();
        String::from_utf8(out).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn header_counts_every_section() {
        let lines = stream("ROOM Hall;\nDEVICE LAMP Hall.Light A 1;\nINT n = 3;\nPROCEDURE Main; n++; END;");
        let days = crate::calendar::WINDOW_DAYS;
        assert_eq!(lines[0], format!("SmartCode {days} 0 1 1 0 1 0 {}", days + 3));
        assert_eq!(lines.iter().filter(|l| *l == END_OF_SECTION).count(), 7);
    }

    #[test]
    fn sections_after_the_calendar() {
        let lines = stream(
            "ROOM Hall;\nPROCEDURE Main; n++; END;\n\
             HOUSECODE Upstairs A OFFPROCEDURE Main ONPROCEDURE Main;\n\
             DEVICE LAMP Hall.Light A 2 OFFPROCEDURE Main;\n\
             INT n = -4;\nTIMEOUT Linger 01:00 OFFPROCEDURE Main;\n\
             TIMER \"Evening\"\n  SEQUENCE \"Dusk\" SUNSET ALL;\n    EVENT 00:30 Main;\nEND;",
        );
        let calendar_end = lines.iter().position(|l| l == END_OF_SECTION).unwrap();
        assert_eq!(
            lines[calendar_end + 1..],
            [
                "6 0 0 Upstairs",
                END_OF_SECTION,
                "1 6 28 0 -1 00:00:00:00:00:00:00:00-00 Hall.Light",
                END_OF_SECTION,
                "-4 n",
                END_OF_SECTION,
                "1 Evening",
                "1 -2 127 Dusk",
                "0 1800",
                END_OF_SECTION,
                "3 5 Main",
                "24 0",
                "7",
                "25 0",
                END_OF_SECTION,
                "3600 0 Linger",
                END_OF_SECTION,
            ]
        );
    }

    #[test]
    fn calendar_rows_are_epoch_seconds() {
        let lines = stream("");
        // 2024-03-01 00:00 UTC
        assert!(lines[1].starts_with("1709251200 "), "{}", lines[1]);
    }
}
