//! 指令解释：规则表 + LLM 兜底分类，把一行自然语言输入变成结构化指令

pub mod classifier;
pub mod command;
pub mod resolver;
pub mod rules;

pub use command::{Command, CommandOrigin, CommandType};
pub use resolver::IntentResolver;
pub use rules::{RuleMatch, RuleTable};
