// Newline-delimited JSON output for dependency relations.

use std::io::Write;

use crate::domain::relation::DependencyRelation;
use crate::error::EmitError;
use crate::ports::RelationSink;

/// Writes each relation as one compact JSON object followed by `\n`.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    line: Vec<u8>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            line: Vec::with_capacity(128),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RelationSink for JsonLinesSink<W> {
    fn emit(&mut self, relation: &DependencyRelation) -> Result<(), EmitError> {
        self.line.clear();
        serde_json::to_writer(&mut self.line, relation).map_err(EmitError::Serialize)?;
        self.line.push(b'\n');
        // A single write per record keeps lines whole on line-buffered stdout.
        self.writer.write_all(&self.line).map_err(EmitError::Write)
    }

    fn finish(&mut self) -> Result<(), EmitError> {
        self.writer.flush().map_err(EmitError::Write)
    }
}
