#[macro_export]
macro_rules! debug_log {
	($($arg:tt)*) => {{
		#[cfg(debug_assertions)]
		{
			eprintln!($($arg)*);
		}
	}};
}

pub mod config;
pub mod language;
pub mod text;
pub mod document;
pub mod multiline;
pub mod tree;
pub mod parse;
pub mod truncate;
pub mod trim;
pub mod pipeline;
pub mod batch;
