//! cloudmgr - Local VM and container provisioning console
//!
//! A thin command-line front end over [`cloudmgr::Console`]. Each invocation
//! runs exactly one console operation and prints its result.
//!
//! ## Usage
//!
//! ```sh
//! cloudmgr vm attach --image debian.qcow2 --cpu 2 --memory 2048
//! cloudmgr vm create --save vms/ --iso debian.iso --from-config vm.json
//! cloudmgr dockerfile --dir ./app --file Dockerfile.template
//! cloudmgr image build --dir ./app --name myapp --tag 1.0
//! cloudmgr image list
//! cloudmgr image search nginx
//! cloudmgr image pull nginx:1.25
//! cloudmgr image hub-search redis
//! cloudmgr container list
//! cloudmgr container stop 3f2a9c1b
//! cloudmgr container run nginx:latest --name web
//! ```
//!
//! ## Exit Status
//!
//! `0` if the operation succeeded, `1` otherwise. With `--json` the full
//! result record is printed to stdout in either case.

use clap::{Args, Parser, Subcommand};
use cloudmgr::{
    ConfigDocument, Console, ConsoleConfig, DockerDaemon, LogSink, OperationResult, SystemRunner,
    VmCreationRequest,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

// =============================================================================
// CLI Parsing
// =============================================================================

/// Local operator console for VM and container provisioning
#[derive(Parser)]
#[command(name = "cloudmgr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Console configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mirror diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the result record as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Virtual machine workflows
    #[command(subcommand)]
    Vm(VmCommand),

    /// Write a Dockerfile into a directory
    Dockerfile {
        /// Target directory
        #[arg(long)]
        dir: PathBuf,
        /// Read content from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Image management
    #[command(subcommand)]
    Image(ImageCommand),

    /// Container management
    #[command(subcommand)]
    Container(ContainerCommand),
}

#[derive(Subcommand)]
enum VmCommand {
    /// Boot an existing disk image
    Attach {
        /// Disk image to boot
        #[arg(long)]
        image: PathBuf,
        #[command(flatten)]
        resources: ResourceArgs,
    },
    /// Create a disk image and boot an installer ISO against it
    Create {
        /// File or directory for the new disk image
        #[arg(long)]
        save: Option<PathBuf>,
        /// Installer ISO
        #[arg(long)]
        iso: Option<PathBuf>,
        /// Disk size in MB
        #[arg(long)]
        disk: Option<String>,
        #[command(flatten)]
        resources: ResourceArgs,
    },
}

#[derive(Args)]
struct ResourceArgs {
    /// Number of virtual CPUs
    #[arg(long)]
    cpu: Option<String>,
    /// Memory in MB
    #[arg(long)]
    memory: Option<String>,
    /// JSON file with cpu, memory and disk_size values
    #[arg(long)]
    from_config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ImageCommand {
    /// Build an image from a directory containing a Dockerfile
    Build {
        #[arg(long)]
        dir: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        tag: String,
    },
    /// List tagged local images
    List,
    /// Find the first local image whose name or tag contains TERM
    Search { term: String },
    /// Pull an image from its registry
    Pull { reference: String },
    /// Search the public registry
    HubSearch { term: String },
}

#[derive(Subcommand)]
enum ContainerCommand {
    /// List running containers
    List,
    /// Stop a running container
    Stop { id: String },
    /// Start a detached container from a local image
    Run {
        image: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

impl Commands {
    /// Whether the command talks to the container daemon.
    fn needs_daemon(&self) -> bool {
        match self {
            Commands::Vm(_) | Commands::Dockerfile { .. } => false,
            Commands::Image(ImageCommand::HubSearch { .. }) => false,
            Commands::Image(_) | Commands::Container(_) => true,
        }
    }
}

// =============================================================================
// Entry Point
// =============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ConsoleConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cloudmgr: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log = match LogSink::open(&config.log_file, cli.verbose) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("cloudmgr: cannot open log file {}: {}", config.log_file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut console = Console::new(&config, Arc::new(SystemRunner), log);
    if cli.command.needs_daemon() {
        match DockerDaemon::connect(&config) {
            Ok(daemon) => console = console.with_container_daemon(Arc::new(daemon)),
            Err(e) => {
                eprintln!("cloudmgr: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let result = match dispatch(&console, cli.command) {
        Ok(result) => result,
        Err(message) => {
            eprintln!("cloudmgr: {}", message);
            return ExitCode::FAILURE;
        }
    };

    report(&result, cli.json);

    if let Err(e) = console.shutdown() {
        eprintln!("cloudmgr: failed to flush log: {}", e);
    }

    if result.succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Runs one command. `Err` covers input the console never saw.
fn dispatch(console: &Console, command: Commands) -> Result<OperationResult, String> {
    let result = match command {
        Commands::Vm(VmCommand::Attach { image, resources }) => {
            let (document, from_config) = resources.split(None);
            let request = VmCreationRequest::ExistingImage {
                image_path: image,
                resources: document,
            };
            create_vm(console, &request, from_config.as_deref())
        }
        Commands::Vm(VmCommand::Create {
            save,
            iso,
            disk,
            resources,
        }) => {
            let (document, from_config) = resources.split(disk);
            let request = VmCreationRequest::NewImage {
                save_path: save,
                iso_path: iso,
                resources: document,
            };
            create_vm(console, &request, from_config.as_deref())
        }
        Commands::Dockerfile { dir, file } => {
            let content = read_content(file)?;
            console.write_dockerfile(&dir, &content)
        }
        Commands::Image(cmd) => match cmd {
            ImageCommand::Build { dir, name, tag } => console.build_image(&dir, &name, &tag),
            ImageCommand::List => console.list_images(),
            ImageCommand::Search { term } => console.search_local_images(&term),
            ImageCommand::Pull { reference } => console.pull_image(&reference),
            ImageCommand::HubSearch { term } => console.search_registry(&term),
        },
        Commands::Container(cmd) => match cmd {
            ContainerCommand::List => console.list_containers(),
            ContainerCommand::Stop { id } => console.stop_container(&id),
            ContainerCommand::Run { image, name } => console.run_container(&image, &name),
        },
    };
    Ok(result)
}

impl ResourceArgs {
    /// Flag values plus the optional document that fills the rest.
    fn split(self, disk: Option<String>) -> (ConfigDocument, Option<PathBuf>) {
        let document = ConfigDocument::new(
            self.cpu.unwrap_or_default(),
            self.memory.unwrap_or_default(),
            disk.unwrap_or_default(),
        );
        (document, self.from_config)
    }
}

/// Flags win over values loaded with `--from-config`.
fn create_vm(
    console: &Console,
    request: &VmCreationRequest,
    from_config: Option<&Path>,
) -> OperationResult {
    match from_config {
        Some(path) => console.create_vm_from_config(request, path),
        None => console.create_vm(request),
    }
}

fn read_content(file: Option<PathBuf>) -> Result<String, String> {
    match file {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e)),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .map_err(|e| format!("cannot read stdin: {}", e))?;
            Ok(content)
        }
    }
}

fn report(result: &OperationResult, json: bool) {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("cloudmgr: failed to encode result: {}", e),
        }
    } else if result.succeeded {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
}
