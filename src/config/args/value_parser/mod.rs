pub mod bucket;
pub mod checksum_algorithm;
pub mod extra_flag;
pub mod human_bytes;
pub mod storage_class;
pub mod transfer_tool;
pub mod url;
