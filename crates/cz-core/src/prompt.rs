//! The question sent to the model for `solve`.

/// Build the prompt describing a command, its result and the user's question.
///
/// `from_capture` says whether `output` came from the shell hook's capture
/// file or from re-running the command.
pub fn build_prompt(
    command: &str,
    exit_code: i32,
    output: &str,
    user_prompt: &str,
    from_capture: bool,
) -> String {
    let failed = exit_code != 0;
    let mut prompt = String::new();

    if failed {
        prompt.push_str("A Linux command failed and I need help fixing it.\n\n");
    } else {
        prompt.push_str("A Linux command was run and I need an explanation.\n\n");
    }

    prompt.push_str(&format!("COMMAND: {command}\n"));
    prompt.push_str(&format!("EXIT CODE: {exit_code}\n\n"));

    if from_capture {
        prompt.push_str("CAPTURED ERROR INFO:\n");
    } else {
        prompt.push_str("COMMAND OUTPUT:\n");
    }
    prompt.push_str(output);
    prompt.push_str("\n\n");

    prompt.push_str(&format!("USER QUESTION: {user_prompt}\n\n"));

    if failed {
        prompt.push_str("Please:\n");
        prompt.push_str("1. Explain what went wrong\n");
        prompt.push_str("2. Provide the corrected command\n");
        prompt.push_str("3. Explain why the fix works\n");
    } else {
        prompt.push_str("Please explain what this command does and the output.\n");
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_command_from_capture() {
        let p = build_prompt(
            "gti status",
            127,
            "gti: command not found",
            "Help me fix this error",
            true,
        );
        assert_eq!(
            p,
            "A Linux command failed and I need help fixing it.\n\n\
             COMMAND: gti status\n\
             EXIT CODE: 127\n\n\
             CAPTURED ERROR INFO:\n\
             gti: command not found\n\n\
             USER QUESTION: Help me fix this error\n\n\
             Please:\n\
             1. Explain what went wrong\n\
             2. Provide the corrected command\n\
             3. Explain why the fix works\n"
        );
    }

    #[test]
    fn successful_rerun() {
        let p = build_prompt("ls", 0, "Cargo.toml", "what is this?", false);
        assert!(p.starts_with("A Linux command was run and I need an explanation.\n\n"));
        assert!(p.contains("COMMAND OUTPUT:\nCargo.toml\n\n"));
        assert!(!p.contains("CAPTURED ERROR INFO"));
        assert!(p.ends_with("Please explain what this command does and the output.\n"));
    }
}
