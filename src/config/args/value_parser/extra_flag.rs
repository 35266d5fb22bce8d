const NOT_A_FLAG: &str = "extra flags must start with '-'. positional arguments are not allowed.";

pub fn check_extra_flag(flag: &str) -> Result<String, String> {
    if !flag.starts_with('-') || flag.trim_start_matches('-').is_empty() {
        return Err(NOT_A_FLAG.to_string());
    }

    Ok(flag.to_string())
}
