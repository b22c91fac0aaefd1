//! Minimal console front end for the pipeline.
//!
//! Real deployments bind a global hotkey and a transparent overlay; this
//! binary drives the same pipeline from stdin so the core can be used
//! (and demoed) without any window layer: press Enter to capture and
//! answer, `q` + Enter to quit.

use quiz_glass::{Config, Pipeline, PipelineEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() {
    quiz_glass::config::load_dotenv();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let (pipeline, mut events) = Pipeline::from_config(&config);

    // Event consumer — prints the streamed answer as it arrives.
    let printer = tokio::spawn(async move {
        use std::io::Write;
        while let Some(event) = events.recv().await {
            match event {
                PipelineEvent::Started => println!("Thinking..."),
                PipelineEvent::Chunk(text) => {
                    print!("{text}");
                    let _ = std::io::stdout().flush();
                }
                PipelineEvent::ExtractionComplete(result) => {
                    log::info!(
                        "[UI] Extraction complete: question_found={}",
                        result.question_found
                    );
                }
                PipelineEvent::Finished => println!(),
                PipelineEvent::Error(message) => eprintln!("Error: {message}"),
                PipelineEvent::Quit => break,
            }
        }
    });

    println!("Press Enter to capture the screen and get an answer; q + Enter to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().eq_ignore_ascii_case("q") {
            break;
        }
        pipeline.trigger();
    }

    pipeline.quit().await;
    let _ = printer.await;
}
