//! curl Export
//!
//! Renders captured endpoints as runnable curl commands, one per line, for
//! copy/export alongside the structured report formats.

use crate::http::ReplayRequestDescriptor;

/// Render one captured endpoint as a curl command.
pub fn generate(descriptor: &ReplayRequestDescriptor) -> String {
    descriptor.to_curl()
}

/// Render a capture set as a shell script body, one command per line.
pub fn generate_script(descriptors: &[ReplayRequestDescriptor]) -> String {
    let mut script = String::from("#!/bin/sh\n");
    for descriptor in descriptors {
        script.push_str(&descriptor.to_curl());
        script.push('\n');
    }
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_single_command() {
        let descriptor = ReplayRequestDescriptor::new("GET", "https://api.example.com/me")
            .with_header("Authorization", "Bearer abc");

        let cmd = generate(&descriptor);
        assert!(cmd.starts_with("curl -X GET 'https://api.example.com/me'"));
        assert!(cmd.contains("-H 'authorization: Bearer abc'"));
    }

    #[test]
    fn test_generate_script_one_line_per_endpoint() {
        let endpoints = vec![
            ReplayRequestDescriptor::new("GET", "https://api.example.com/a"),
            ReplayRequestDescriptor::new("POST", "https://api.example.com/b")
                .with_body("{}"),
        ];

        let script = generate_script(&endpoints);
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "#!/bin/sh");
        assert!(lines[2].contains("--data '{}'"));
    }
}
