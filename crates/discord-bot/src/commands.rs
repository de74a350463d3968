use serenity::builder::CreateApplicationCommands;

pub mod countdown;
pub mod rally;
pub mod voice;

/// Add every slash command the bot answers to `commands`.
///
/// Used for both guild-scoped and global registration.
pub fn register_commands(commands: &mut CreateApplicationCommands) -> &mut CreateApplicationCommands {
    commands.create_application_command(|command| {
        *command = rally::rally_command();
        command
    });

    commands.create_application_command(|command| {
        *command = countdown::type_of_rally_command();
        command
    });

    commands.create_application_command(|command| {
        *command = voice::stay_command();
        command
    });

    commands.create_application_command(|command| {
        *command = voice::leave_command();
        command
    });

    commands
}
