pub mod archive;
pub mod artifact;
pub mod clock;
pub mod command;
pub mod compress;
pub mod config;
pub mod context;
pub mod file_ext;
pub mod finish;
pub mod handlers;
pub mod humanize;
pub mod job;
pub mod pipeline;
pub mod redacted;
pub mod remove_tree;
pub mod result_error;
pub mod router;
pub mod tar;
pub mod template;
pub mod validate;

#[cfg(test)]
pub mod testing;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
