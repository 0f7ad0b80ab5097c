use std::io::{self, Write};

pub struct ShellPrompt {
    text: String,
}

impl ShellPrompt {
    pub fn new(text: &str) -> Self {
        ShellPrompt {
            text: text.to_string(),
        }
    }

    pub fn show(&self) {
        print!("{}", self.text);
        let _ = io::stdout().flush();
    }

    pub fn read_line(&self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        let bytes_read = io::stdin().read_line(&mut buf)?;
        if bytes_read == 0 {
            // EOF (e.g., Ctrl-D)
            println!();
            return Ok(None);
        }
        Ok(Some(buf.trim_end().to_string()))
    }
}
