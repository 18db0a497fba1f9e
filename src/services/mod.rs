pub mod response_parser;
pub mod supervisor;
pub mod word_filter;

pub use response_parser::{parse_response, ParsedResponse};
pub use supervisor::{ServiceSupervisor, SupervisorDecision};
pub use word_filter::WordFilter;
