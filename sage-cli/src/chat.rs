use std::io::Write;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use sage_rag::RagPipeline;
use tracing::warn;

/// Column at which answers are wrapped.
pub const WRAP_WIDTH: usize = 80;

const PROMPT: &str = "You: ";

/// Whether the input ends the session.
pub fn is_exit(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Wrap each line of `text` at `width` columns on word boundaries.
///
/// Line breaks and leading indentation are kept, so lists and code in an
/// answer stay readable. A word longer than `width` gets a line of its own.
pub fn wrap(text: &str, width: usize) -> String {
    text.lines().map(|line| wrap_line(line, width)).collect::<Vec<_>>().join("\n")
}

fn wrap_line(line: &str, width: usize) -> String {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return String::new();
    }
    let indent = &line[..line.len() - trimmed.len()];
    let indent_width = indent.chars().count();

    let mut lines = Vec::new();
    let mut current = String::from(indent);
    let mut current_width = indent_width;
    let mut empty = true;
    for word in trimmed.split_whitespace() {
        let word_width = word.chars().count();
        if !empty && current_width + 1 + word_width > width {
            lines.push(std::mem::replace(&mut current, String::from(indent)));
            current_width = indent_width;
            empty = true;
        }
        if !empty {
            current.push(' ');
            current_width += 1;
        }
        current.push_str(word);
        current_width += word_width;
        empty = false;
    }
    lines.push(current);
    lines.join("\n")
}

/// Run the interactive loop until `exit`, `quit`, Ctrl-D or Ctrl-C.
pub async fn run(pipeline: &RagPipeline, collection: &str, store: &str) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;

    println!("\nOracle Sage is online ({store}). Type 'exit' to quit.");
    println!("{}", "-".repeat(50));

    loop {
        let line = match tokio::task::block_in_place(|| editor.readline(PROMPT)) {
            Ok(line) => line,
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
            Err(e) => return Err(e.into()),
        };
        if is_exit(&line) {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if let Err(e) = editor.add_history_entry(question) {
            warn!(error = %e, "could not record history");
        }

        print!("Thinking...\r");
        std::io::stdout().flush()?;

        match pipeline.answer(collection, question).await {
            Ok(answer) => {
                println!("\n{}", wrap(&format!("Sage: {}", answer.text), WRAP_WIDTH));
                if !answer.has_context() {
                    println!("(no matching notes in '{collection}'; answered from general knowledge)");
                }
            }
            Err(e) => println!("\nError: {e}"),
        }
        println!();
    }

    println!("Goodbye.");
    Ok(())
}
