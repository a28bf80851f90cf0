use redis::Script;
use std::sync::LazyLock;

const ROW_WRITE_SCRIPT_BODY: &str = include_str!("../../lua/row_write.lua");

pub static ROW_WRITE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(ROW_WRITE_SCRIPT_BODY));
