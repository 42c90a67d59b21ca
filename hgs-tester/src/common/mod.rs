pub mod util;

pub use util::{parse_fatality_policy, report_timestamp, split_csv};
