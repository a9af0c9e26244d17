extern crate clap;
extern crate distimage;
extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;

mod collaborators;
mod errors;

use self::{
    collaborators::{ExternalBootLoader, NoInstallMedia, PreparedBootImage},
    errors::DistimageError,
};
use clap::{App, Arg, ArgMatches};
use distimage::{
    builder::{NoSystemSetup, QemuImgFormat},
    Collaborators, DiskBuildConfig, DiskBuilder, StandardDiskSetup, System,
};
use std::{path::Path, process::exit};

fn main() {
    let matches = App::new("distimage")
        .about("builds bootable disk images from a prepared system tree")
        .arg(
            Arg::with_name("description")
                .short("d")
                .long("description")
                .help("JSON build description of the disk image")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("root")
                .short("r")
                .long("root")
                .help("system tree which is synced into the image")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("boot-root")
                .short("b")
                .long("boot-root")
                .help("prepared boot tree holding the kernel and initrd (defaults to the root)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("target")
                .short("t")
                .long("target-dir")
                .help("directory the image and its result file are written to")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("name")
                .short("n")
                .long("name")
                .help("overrides the image name of the build description")
                .takes_value(true),
        )
        .get_matches();

    if let Err(err) = distimage::log(|_level, message| {
        println!("{}", message);
    }) {
        eprintln!("Failed to initialize logging: {}", err);
    }

    let status = match build(&matches) {
        Ok(()) => {
            println!("build was successful");
            0
        }
        Err(why) => {
            eprintln!("distimage: {}", why);
            1
        }
    };

    exit(status);
}

fn build(matches: &ArgMatches) -> Result<(), DistimageError> {
    // Required by clap.
    let description = matches.value_of("description").unwrap_or_default();
    let root = Path::new(matches.value_of("root").unwrap_or_default());
    let target = Path::new(matches.value_of("target").unwrap_or_default());
    let boot_root = matches.value_of("boot-root").map_or(root, Path::new);

    let mut config = DiskBuildConfig::from_file(description)
        .map_err(|why| DistimageError::Description { why })?;
    if let Some(name) = matches.value_of("name") {
        config.name = name.into();
    }

    let runner = System::shared();
    let firmware = config.firmware_model()?;

    let collaborators = Collaborators {
        boot_image:         Box::new(PreparedBootImage::new(boot_root, target)),
        disk_setup:         Box::new(StandardDiskSetup::new(&config, firmware, root)),
        bootloader_config:  Box::new(ExternalBootLoader),
        bootloader_install: Box::new(ExternalBootLoader),
        install_media:      Box::new(NoInstallMedia),
        disk_format:        Box::new(QemuImgFormat::new(runner.clone())),
        system_setup:       Box::new(NoSystemSetup),
    };

    let mut builder = DiskBuilder::new(config, root, target, runner, collaborators)?;
    let result = builder.create()?;

    result
        .dump(target.join("build.result.json"))
        .map_err(|why| DistimageError::ResultDump { why })?;

    for (role, entry) in result.entries() {
        info!("{}: {}", role, entry.filename.display());
    }

    Ok(())
}
