use comfy_table::{presets::UTF8_FULL, Attribute, Cell, CellAlignment, ContentArrangement, Table};
use ripple::{Context, Snapshot};

pub struct Formatter;

impl Formatter {
    /// Raw mode: one resolved value per line, nothing else
    pub fn format_raw(&self, products: &Context) -> String {
        let mut names: Vec<&str> = products.iter().map(|(name, _)| name.as_str()).collect();
        names.sort_unstable();

        let mut output = String::new();
        for name in names {
            output.push_str(&products.get(name).keyed("").to_string());
            output.push('\n');
        }
        output
    }

    /// The main view: every rule next to its product, or a marker when the
    /// rule is still unresolved
    pub fn format_products(&self, snapshot: &Snapshot) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Rule").add_attribute(Attribute::Bold),
            Cell::new("Expression")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Left),
            Cell::new("Product")
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Left),
        ]);

        let mut names: Vec<&str> = snapshot.rules.iter().map(|(name, _)| name.as_str()).collect();
        names.sort_unstable();

        for name in names {
            let rule = snapshot.rules.get(name).keyed("");
            let product = if snapshot.products.contains(name) {
                snapshot.products.get(name).keyed("").to_string()
            } else {
                "[unresolved]".to_string()
            };

            table.add_row(vec![
                Cell::new(name),
                Cell::new(rule.to_string()).set_alignment(CellAlignment::Left),
                Cell::new(product).set_alignment(CellAlignment::Left),
            ]);
        }

        format!("{}\n", table)
    }

    /// The dependency view: each rule with what it reads and who reads it
    pub fn format_rules(&self, rules: &Context) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Rule").add_attribute(Attribute::Bold),
            Cell::new("Expression").add_attribute(Attribute::Bold),
            Cell::new("Reads").add_attribute(Attribute::Bold),
            Cell::new("Read by").add_attribute(Attribute::Bold),
        ]);

        let mut names: Vec<&str> = rules.iter().map(|(name, _)| name.as_str()).collect();
        names.sort_unstable();

        for name in names {
            table.add_row(vec![
                Cell::new(name),
                Cell::new(rules.get(name).keyed("").to_string()),
                Cell::new(sorted_list(&rules.get_incoming(name))),
                Cell::new(sorted_list(&rules.get_outgoing(name))),
            ]);
        }

        format!("{}\n", table)
    }
}

fn sorted_list(names: &ripple::Set) -> String {
    let mut names: Vec<&str> = names.iter().map(String::as_str).collect();
    names.sort_unstable();
    names.join(" ")
}
