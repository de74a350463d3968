use serenity::builder::CreateApplicationCommand;

/// Create command for keeping a temporary voice channel
pub fn stay_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("stay")
        .description("Keep your temporary rally voice channel until /leave")
        .dm_permission(false);

    command
}

/// Create command for tearing voice down
pub fn leave_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("leave")
        .description("Stop countdowns, disconnect the bot and delete the temporary voice channel")
        .dm_permission(false);

    command
}
