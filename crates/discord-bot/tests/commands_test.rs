use pretty_assertions::assert_eq;
use rallybot_discord_bot::commands::{self, countdown, rally, voice};
use serde_json::Value;
use serenity::builder::CreateApplicationCommands;

fn option_names(options: &Value) -> Vec<String> {
    options
        .as_array()
        .map(|opts| {
            opts.iter()
                .filter_map(|o| o["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_register_commands() {
    let mut commands = CreateApplicationCommands::default();
    commands::register_commands(&mut commands);

    let names: Vec<&str> = commands.0.iter().filter_map(|c| c["name"].as_str()).collect();
    assert_eq!(names, vec!["rally", "type_of_rally", "stay", "leave"]);
}

#[test]
fn test_rally_subcommands() {
    let command = rally::rally_command();
    assert_eq!(option_names(&command.0["options"]), vec!["keep", "sop"]);
}

#[test]
fn test_type_of_rally_choices() {
    let command = countdown::type_of_rally_command();
    let options = &command.0["options"];
    assert_eq!(option_names(options), vec!["bomb", "rolling", "stop", "explain"]);

    let choice_values = |sub: usize| -> Vec<String> {
        options[sub]["options"][0]["choices"]
            .as_array()
            .map(|choices| {
                choices
                    .iter()
                    .filter_map(|c| c["value"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };

    assert_eq!(choice_values(0), vec!["5m", "10m", "30m", "1h"]);
    assert_eq!(choice_values(1), vec!["5s", "10s", "15s", "30s"]);
    assert_eq!(choice_values(3), vec!["bomb", "rolling"]);
}

#[test]
fn test_voice_commands() {
    assert_eq!(voice::stay_command().0["name"], "stay");
    assert_eq!(voice::leave_command().0["name"], "leave");
}
