use rallybot_core::models::countdown::{BombDuration, RollingGap};
use serenity::{
    builder::CreateApplicationCommand,
    model::application::command::CommandOptionType,
};

/// Create command for running voice countdowns
pub fn type_of_rally_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("type_of_rally")
        .description("Bomb rallies, Rolling rallies, explanations")
        .dm_permission(false)
        // Bomb subcommand
        .create_option(|option| {
            option
                .name("bomb")
                .description("Start a bomb rally countdown in voice")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("duration")
                        .description("How long until the bomb lands")
                        .kind(CommandOptionType::String)
                        .required(true);

                    for duration in BombDuration::ALL {
                        sub_option.add_string_choice(duration.label(), duration.as_str());
                    }

                    sub_option
                })
        })
        // Rolling subcommand
        .create_option(|option| {
            option
                .name("rolling")
                .description("Start a rolling rally in voice")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("gap")
                        .description("Time between rally launches")
                        .kind(CommandOptionType::String)
                        .required(true);

                    for gap in RollingGap::ALL {
                        sub_option.add_string_choice(gap.label(), gap.as_str());
                    }

                    sub_option
                })
        })
        // Stop subcommand
        .create_option(|option| {
            option
                .name("stop")
                .description("Stop the countdown running in your voice channel")
                .kind(CommandOptionType::SubCommand)
        })
        // Explain subcommand
        .create_option(|option| {
            option
                .name("explain")
                .description("Explain how bomb or rolling rallies work")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("kind")
                        .description("Which rally type to explain")
                        .kind(CommandOptionType::String)
                        .required(true)
                        .add_string_choice("Bomb Rally", "bomb")
                        .add_string_choice("Rolling Rally", "rolling")
                })
        });

    command
}
