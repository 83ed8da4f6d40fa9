pub mod header;
pub mod reader;

pub use header::{parse_header, SyslogHeader};
pub use reader::{LogLine, ReadSummary, Reader};
