//! Main entry point for CLI command to execute a request.

fn main() -> anyhow::Result<()> {
    apollo_executor::main()
}
