//! Advisor prompt inspection

use anyhow::Result;
use budgee_core::prompts::{default_prompts_dir, Prompt, PromptId, PromptLibrary};

fn source_label(is_override: bool) -> &'static str {
    if is_override {
        "override"
    } else {
        "built-in"
    }
}

/// Print every advisor prompt with the model task it routes to
pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();

    println!("{:<20} {:>3}  {:<14} SOURCE", "PROMPT", "V", "TASK");
    for info in library.list() {
        println!(
            "{:<20} {:>3}  {:<14} {}",
            info.id,
            info.version,
            info.task_type,
            source_label(info.has_override)
        );
        if let Some(path) = info.override_path {
            println!("{:<20} {}", "", path.display());
        }
    }

    match default_prompts_dir() {
        Some(dir) => println!("\nDrop <prompt>.md into {} to override.", dir.display()),
        None => println!("\nNo data directory; only built-in prompts are available."),
    }
    Ok(())
}

fn print_prompt(prompt: &Prompt) {
    let meta = &prompt.metadata;
    println!(
        "{} v{} [{}] ({})",
        meta.id,
        meta.version,
        meta.task_type,
        source_label(prompt.is_override)
    );
    if let Some(path) = &prompt.override_path {
        println!("from {}", path.display());
    }
    println!();
    println!("{}", prompt.content);
}

/// Print a single prompt; unknown ids list the valid ones instead of failing
pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let Ok(id) = prompt_id.parse::<PromptId>() else {
        let known: Vec<&str> = PromptId::all().iter().map(|id| id.as_str()).collect();
        eprintln!("No prompt named '{}'. Known: {}", prompt_id, known.join(", "));
        return Ok(());
    };

    let mut library = PromptLibrary::new();
    print_prompt(library.get(id)?);
    Ok(())
}

pub fn cmd_prompts_path() -> Result<()> {
    let Some(dir) = default_prompts_dir() else {
        eprintln!("No data directory on this system; prompt overrides are unavailable.");
        return Ok(());
    };

    println!("{}", dir.display());
    if !dir.exists() {
        eprintln!("(not created yet)");
    }
    Ok(())
}
