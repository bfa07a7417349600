use crate::model::{FileDiff, LineKind};

impl FileDiff {
    /// Textual view of the diff sent to the model, one file per request.
    pub fn prompt_text(&self) -> String {
        let mut out = String::new();
        out.push_str("File: ");
        out.push_str(&self.filename);
        out.push_str("\n\n");

        for hunk in &self.hunks {
            out.push_str("Hunk:\n");
            for line in &hunk.lines {
                let prefix = match line.kind {
                    LineKind::Added => '+',
                    LineKind::Removed => '-',
                    LineKind::Context => ' ',
                };
                out.push(prefix);
                out.push_str(&line.content);
                out.push('\n');
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;

    #[test]
    fn renders_prefixed_lines_per_hunk() {
        let patch = "diff --git a/main.go b/main.go\n\
+++ b/main.go\n\
@@ -1,1 +1,2 @@\n\
-old\n\
+new\n";
        let files = parse(patch);
        let text = files[0].prompt_text();

        assert_eq!(text, "File: main.go\n\nHunk:\n-old\n+new\n");
    }
}
