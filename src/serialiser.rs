use crate::srt::Subtitle;

use std::io::{BufWriter, Write};
use std::time::Duration;

use anyhow::{Context, Result};

/// Write `subs` in canonical SRT form, renumbering them from 1.
pub fn serialise<W: Write>(subs: &[Subtitle], output: W) -> Result<()> {
    let mut writer = BufWriter::new(output);
    write_subs(&mut writer, subs).context("Failed to write subtitles.")?;
    writer.flush().context("Failed to write subtitles.")?;
    Ok(())
}

pub fn to_srt_string(subs: &[Subtitle]) -> Result<String> {
    let mut buf = Vec::new();
    write_subs(&mut buf, subs).context("Failed to write subtitles.")?;
    String::from_utf8(buf).context("Subtitles are not valid UTF-8.")
}

fn write_subs<W: Write>(buf: &mut W, subs: &[Subtitle]) -> Result<()> {
    for (idx, sub) in subs.iter().enumerate() {
        write_sub(buf, idx + 1, sub)?;
    }
    Ok(())
}

fn write_sub<W: Write>(buf: &mut W, seqnum: usize, sub: &Subtitle) -> Result<()> {
    writeln!(buf, "{}", seqnum)?;
    write_ts(buf, sub.show_at)?;
    write!(buf, " --> ")?;
    write_ts(buf, sub.hide_at)?;
    writeln!(buf)?;
    for line in &sub.text {
        writeln!(buf, "{}", line)?;
    }
    writeln!(buf)?;
    Ok(())
}

fn write_ts<W: Write>(buf: &mut W, timestamp: Duration) -> Result<()> {
    let total_secs = timestamp.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = timestamp.as_millis() % 1000;
    write!(
        buf,
        "{:02}:{:02}:{:02},{:03}",
        hours, minutes, seconds, millis
    )?;
    Ok(())
}
