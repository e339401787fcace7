use crate::target::Target;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            field: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One target as a field/value table. The secret is masked unless `reveal` is set.
pub fn target_table(target: &Target, reveal: bool) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("service", &target.service.to_string());
    builder.add_row("device", &target.device);
    builder.add_row("channel", &display_channel(&target.channel));
    builder.add_row("domain", &target.domain.to_string());
    builder.add_row("node", &target.node);
    builder.add_row("token", &target.token);
    let secret = if reveal { target.secret.clone() } else { mask(&target.secret) };
    builder.add_row("secret", &secret);
    builder.build()
}

fn display_channel(channel: &str) -> String {
    if channel.is_empty() {
        "(default)".to_string()
    } else {
        channel.to_string()
    }
}

fn mask(secret: &str) -> String {
    "*".repeat(secret.chars().count().min(8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Jid;

    fn sample() -> Target {
        Target::new(
            Jid::domain("svc1").unwrap(),
            "dev-A",
            Jid::domain("push.example").unwrap(),
            "tok1",
            "nodeX",
            "s3cr3t",
        )
    }

    #[test]
    fn test_empty_builder() {
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_target_table_masks_secret() {
        let table = target_table(&sample(), false);
        assert!(table.contains("push.example"));
        assert!(table.contains("(default)"));
        assert!(!table.contains("s3cr3t"));
        assert!(table.contains("******"));
    }

    #[test]
    fn test_target_table_reveal() {
        let table = target_table(&sample().with_channel("work"), true);
        assert!(table.contains("s3cr3t"));
        assert!(table.contains("work"));
    }
}
