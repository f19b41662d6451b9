//! agent-relay 入口：初始化日志、按配置组装指令管线，并运行标准输入聊天循环。
//!
//! `sair` 退出，`limpar` 清空聊天历史；处理指令期间 Ctrl+C 只中断当前等待，空闲时 Ctrl+C 退出。

use std::io::Write;
use std::path::PathBuf;

use agent_relay::config::{load_config, AppConfig};
use agent_relay::core::{PipelineBuilder, SessionSupervisor};
use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    agent_relay::observability::init();

    let config_path = std::env::var("RELAY_CONFIG").ok().map(PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    });
    let app_name = cfg.app.name.clone().unwrap_or_else(|| "agent-relay".to_string());

    let pipeline = PipelineBuilder::new(cfg)
        .with_system_prompt_from_file()
        .build()
        .context("Failed to compile command rules")?;
    let supervisor = SessionSupervisor::new();

    println!("🤖 {app_name} pronto. Digite 'ajuda' para ver os comandos, 'sair' para encerrar.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else { break };
        let input = line.trim();

        match input.to_lowercase().as_str() {
            "" => continue,
            "sair" | "exit" | "quit" => break,
            "limpar" => {
                pipeline.clear_history();
                println!("🧹 Histórico de conversa apagado.\n");
                continue;
            }
            _ => {}
        }

        let token = supervisor.begin_turn();
        let watcher = supervisor.spawn_interrupt_watcher();
        let reply = pipeline.handle_with_cancel(input, &token).await;
        watcher.abort();

        println!("{reply}\n");
    }

    println!("👋 Até logo!");
    Ok(())
}
