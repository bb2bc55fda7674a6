//! Interactive variant selection on the console.

use async_trait::async_trait;
use hlsget_engine::{VariantPrompt, VariantStream};
use tokio::signal;
use tokio::task;

/// Presents the sorted variant list and blocks on stdin for a 1-based
/// choice. Ctrl-c or a closed stdin cancels the whole run.
pub struct ConsolePrompt;

#[async_trait]
impl VariantPrompt for ConsolePrompt {
    async fn choose(&self, variants: &[VariantStream]) -> Option<usize> {
        println!("Available qualities:");
        for (position, variant) in variants.iter().enumerate() {
            match variant.resolution {
                Some(resolution) => {
                    println!("{}. {} ({} bps)", position + 1, resolution, variant.bandwidth)
                }
                None => println!("{}. unknown ({} bps)", position + 1, variant.bandwidth),
            }
        }

        let count = variants.len();
        loop {
            println!("Select quality (1-{count}):");
            let read_line = task::spawn_blocking(|| {
                let mut line = String::new();
                std::io::stdin().read_line(&mut line).ok().map(|n| (n, line))
            });
            tokio::select! {
                _ = signal::ctrl_c() => {
                    println!("Selection cancelled.");
                    return None;
                }
                read = read_line => {
                    match read.ok().flatten() {
                        // Read failure or EOF: nothing more will arrive.
                        None | Some((0, _)) => return None,
                        Some((_, line)) => match line.trim().parse::<usize>() {
                            Ok(choice) if (1..=count).contains(&choice) => {
                                return Some(choice - 1);
                            }
                            _ => {
                                println!(
                                    "Invalid choice. Enter a number between 1 and {count}."
                                );
                            }
                        },
                    }
                }
            }
        }
    }
}
