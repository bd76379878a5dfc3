use std::fs;

const CONFIG_PATH: &str = "src/default_config.toml";

/// Keys the shipped defaults must set, with the TOML type each must have.
const REQUIRED: &[(&str, &str, &str)] = &[
    ("styles", "code_font", "string"),
    ("styles", "code_font_size", "float"),
    ("styles", "bullet_preset", "string"),
    ("styles", "numbered_preset", "string"),
    ("read", "max_lines", "integer"),
];

fn main() {
    println!("cargo:rerun-if-changed={}", CONFIG_PATH);

    let content = fs::read_to_string(CONFIG_PATH).expect("Failed to read default_config.toml");
    let table = match content.parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("Invalid default_config.toml: {}", e),
    };

    for (section, key, kind) in REQUIRED {
        let value = table
            .get(*section)
            .and_then(|s| s.get(*key))
            .unwrap_or_else(|| panic!("default_config.toml is missing [{}] {}", section, key));
        if value.type_str() != *kind {
            panic!(
                "default_config.toml: [{}] {} must be a {}, found {}",
                section,
                key,
                kind,
                value.type_str()
            );
        }
    }
}
