//! Fixed-width ASCII table output for morphology results.
//!
//! One row per source, catalog passthrough columns first, then the
//! statistics with their flag columns. Failed statistics render as `NaN`
//! with their integer flag, so a failed source still occupies a full row.

use std::io::{self, Write};

use crate::result::MorphologyResult;
use crate::source::SourceRecord;

const NAME_WIDTH: usize = 24;
const VALUE_WIDTH: usize = 12;
const FLAG_WIDTH: usize = 7;

/// Writer appending one fixed-width row per source.
///
/// The header is emitted before the first row. Column layout is stable so
/// downstream tooling can slice rows by byte offset.
pub struct FixedWidthTableWriter<W: Write> {
    writer: W,
    wrote_header: bool,
}

impl<W: Write> FixedWidthTableWriter<W> {
    /// Wrap an output stream.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            wrote_header: false,
        }
    }

    /// Append one source row, writing the header first if needed.
    pub fn write_row(
        &mut self,
        name: &str,
        record: &SourceRecord,
        result: &MorphologyResult,
    ) -> io::Result<()> {
        if !self.wrote_header {
            self.write_header()?;
            self.wrote_header = true;
        }

        write!(self.writer, "{:<width$}", name, width = NAME_WIDTH)?;
        self.values(&[
            record.elongation,
            record.x,
            record.y,
            record.kron_radius,
            record.semi_major,
            record.semi_minor,
            record.theta,
            record.ra,
            record.dec,
            record.ellipticity,
            result.background_median,
            result.background_rms,
            result.petrosian_radius,
        ])?;
        self.flag(result.petrosian_flag.code())?;
        self.values(&[
            result.asymmetry,
            result.asymmetry_center.0,
            result.asymmetry_center.1,
        ])?;
        self.flag(result.asymmetry_flag.code())?;
        self.values(&[result.concentration])?;
        self.flag(result.concentration_flag.code())?;
        self.values(&[result.gini])?;
        self.flag(result.gini_flag.code())?;
        self.values(&[result.m20, result.m20_center.0, result.m20_center.1])?;
        self.flag(result.m20_flag.code())?;
        writeln!(self.writer)
    }

    /// Finish writing and flush the stream.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn values(&mut self, values: &[f64]) -> io::Result<()> {
        for value in values {
            write!(self.writer, "{:>width$.4}", value, width = VALUE_WIDTH)?;
        }
        Ok(())
    }

    fn flag(&mut self, code: i32) -> io::Result<()> {
        write!(self.writer, "{:>width$}", code, width = FLAG_WIDTH)
    }

    fn write_header(&mut self) -> io::Result<()> {
        write!(self.writer, "{:<width$}", "name", width = NAME_WIDTH)?;
        for column in [
            "e", "x", "y", "kron", "a", "b", "theta", "ra", "dec", "elipt", "med", "rms", "rp",
        ] {
            write!(self.writer, "{:>width$}", column, width = VALUE_WIDTH)?;
        }
        write!(self.writer, "{:>width$}", "rpflag", width = FLAG_WIDTH)?;
        for column in ["A", "Acx", "Acy"] {
            write!(self.writer, "{:>width$}", column, width = VALUE_WIDTH)?;
        }
        write!(self.writer, "{:>width$}", "Aflag", width = FLAG_WIDTH)?;
        write!(self.writer, "{:>width$}", "C", width = VALUE_WIDTH)?;
        write!(self.writer, "{:>width$}", "Cflag", width = FLAG_WIDTH)?;
        write!(self.writer, "{:>width$}", "G", width = VALUE_WIDTH)?;
        write!(self.writer, "{:>width$}", "Gflag", width = FLAG_WIDTH)?;
        for column in ["M", "Mcx", "Mcy"] {
            write!(self.writer, "{:>width$}", column, width = VALUE_WIDTH)?;
        }
        write!(self.writer, "{:>width$}", "Mflag", width = FLAG_WIDTH)?;
        writeln!(self.writer)
    }
}
