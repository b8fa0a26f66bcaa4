//! Main entry point for the phonebook binary.

fn main() -> anyhow::Result<()> {
    phonebook_graph::main()
}
