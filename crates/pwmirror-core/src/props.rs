// ── Property argument parser ──
//
// Turns `key=value key2=value2` command arguments into an ordered
// property dictionary. Tokens without a key or a value are skipped; a
// repeated key keeps its first position and takes the last value.

use pwmirror_api::Properties;

pub fn parse_properties(args: &str) -> Properties {
    let mut props = Properties::new();
    for token in args.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        let value = value.trim_start_matches('=');
        if key.is_empty() || value.is_empty() {
            continue;
        }
        props.set(key, value);
    }
    props
}
