use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bgcheck::utils::logging::log_startup;
use bgcheck::{logger, Config, Engine, MemoryDocument};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

/// 等待文档检查完毕的最长时间
const WAIT_TIMEOUT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config_path = std::env::var_os("BGCHECK_CONFIG").map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("加载配置失败")?;

    // 初始化日志
    logger::init(config.verbose_logging);
    log_startup(&config);

    let input = read_input(std::env::args().nth(1))?;
    let (document, unit) = MemoryDocument::from_paragraphs(split_paragraphs(&input));
    info!("📄 共 {} 个段落", document.paragraphs(unit).len());

    let (engine, handle) = Engine::new(&config, document.clone());
    let engine = engine.with_notifier(|err| eprintln!("❌ {}", err));
    let task = tokio::spawn(engine.run());
    handle.enable(true).await?;

    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !document.is_clean() {
        if Instant::now() >= deadline {
            warn!("⚠️ 等待超时，输出已有结果");
            break;
        }
        sleep(POLL_INTERVAL).await;
    }

    handle.shutdown().await?;
    task.await.context("检查引擎异常退出")?;

    for (index, paragraph) in document.paragraphs(unit).into_iter().enumerate() {
        let line = serde_json::json!({
            "paragraph": index,
            "text": document.content(paragraph),
            "annotations": document.annotations(paragraph),
        });
        println!("{}", line);
    }

    Ok(())
}

/// 读取文件，未给出路径时读取标准输入
fn read_input(path: Option<String>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("读取文件失败: {}", path))
        }
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("读取标准输入失败")?;
            Ok(input)
        }
    }
}

/// 按空行切分段落
fn split_paragraphs(input: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in input.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_paragraphs_on_blank_lines() {
        let input = "Teh cat sat.\non the mat.\n\n\n  \nA dgo barked.\n";
        assert_eq!(
            split_paragraphs(input),
            vec!["Teh cat sat.\non the mat.", "A dgo barked."]
        );
        assert!(split_paragraphs("\n\n").is_empty());
    }
}
