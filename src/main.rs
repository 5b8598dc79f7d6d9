mod cli;

fn main() -> anyhow::Result<()> {
    let command_line_interface = cli::CommandLineInterface::load();
    cli::init_tracing(command_line_interface.verbose());
    command_line_interface.run()
}
