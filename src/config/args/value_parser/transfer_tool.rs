use std::str::FromStr;

use crate::types::TransferTool;

const INVALID_TRANSFER_TOOL: &str = "invalid transfer tool. valid choices: s5cmd | aws .";

pub fn parse_transfer_tool(tool: &str) -> Result<String, String> {
    if TransferTool::from_str(tool).is_err() {
        return Err(INVALID_TRANSFER_TOOL.to_string());
    }

    Ok(tool.to_string())
}
