mod credential;
mod dry_run;
mod extra_flag;
mod target;
mod tracing;
mod transfer;
