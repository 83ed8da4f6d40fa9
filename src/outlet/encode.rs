//! Syslog framing of batches for delivery.
//!
//! A request body is a sequence of RFC 6587 octet-counted frames, one per
//! line: `"<len> <frame>"`. Raw input lines get an RFC 5424 header built from
//! configuration; RFC 5424 input lines are forwarded as-is.

use crate::config::types::{InputFormat, SyslogConfig};
use crate::pipeline::batch::Batch;
use crate::source::reader::LogLine;
use chrono::SecondsFormat;
use std::io::Write;

pub const CONTENT_TYPE: &str = "application/logplex-1";

/// Turns batches into request bodies.
#[derive(Debug, Clone)]
pub struct SyslogEncoder {
    config: SyslogConfig,
}

impl SyslogEncoder {
    pub fn new(config: SyslogConfig) -> Self {
        Self { config }
    }

    pub fn encode(&self, batch: &Batch) -> Vec<u8> {
        // Header plus count prefix is well under 128 bytes per line.
        let mut body = Vec::with_capacity(batch.byte_len() + batch.len() * 128);
        let mut frame = Vec::with_capacity(256);

        for line in &batch.lines {
            frame.clear();
            self.write_frame(&mut frame, line);
            // Writes into a Vec cannot fail.
            let _ = write!(body, "{} ", frame.len());
            body.extend_from_slice(&frame);
        }
        body
    }

    fn write_frame(&self, frame: &mut Vec<u8>, line: &LogLine) {
        match self.config.input_format {
            InputFormat::Rfc5424 => frame.extend_from_slice(&line.raw),
            InputFormat::Raw => {
                let c = &self.config;
                let _ = write!(
                    frame,
                    "<{}>1 {} {} {} {} {} - ",
                    c.prival,
                    line.arrived_at.to_rfc3339_opts(SecondsFormat::Micros, true),
                    c.hostname,
                    c.appname,
                    c.procid,
                    c.msgid,
                );
                frame.extend_from_slice(&line.raw);
            }
        }
    }
}
