use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;

/// Per-step training loss, written as `step,epoch,loss` CSV rows.
pub struct LossLog {
    writer: BufWriter<File>,
}

impl LossLog {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "step,epoch,loss")?;

        Ok(Self { writer })
    }

    pub fn record(&mut self, step: usize, epoch: usize, loss: f64) -> Result<()> {
        writeln!(self.writer, "{step},{epoch},{loss}")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.csv");

        let mut log = LossLog::create(&path).unwrap();
        log.record(1, 0, 0.5).unwrap();
        log.record(2, 0, 0.25).unwrap();
        log.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "step,epoch,loss\n1,0,0.5\n2,0,0.25\n");
    }
}
