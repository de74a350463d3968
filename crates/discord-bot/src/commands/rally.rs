use serenity::{
    builder::CreateApplicationCommand,
    model::application::command::CommandOptionType,
};

/// Create command for posting a new rally
pub fn rally_command() -> CreateApplicationCommand {
    let mut command = CreateApplicationCommand::default();
    command
        .name("rally")
        .description("Create a Keep Rally or a Seat of Power Rally")
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("keep")
                .description("Create a Keep Rally (form)")
                .kind(CommandOptionType::SubCommand)
        })
        .create_option(|option| {
            option
                .name("sop")
                .description("Create a Seat of Power Rally (form)")
                .kind(CommandOptionType::SubCommand)
        });

    command
}
