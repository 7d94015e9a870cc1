#![warn(clippy::unwrap_used)]

use clap::Parser;
use std::{path::PathBuf, sync::Arc};

use predial::{
    pdf::PageSettings, transport::transport_for_root, Configuration, ContextError,
    DocumentAssembler, FormCode, FormRequest, GenerationOutput, OutputTarget, PropertySelection,
    ResourceCache, TaxpayerDataLoader, TaxpayerRecord,
};

#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    #[arg(
        short = 't',
        long = "taxpayer",
        value_name = "identifier",
        required_unless_present = "record_path",
        conflicts_with = "record_path",
        help = "Identifier of the taxpayer whose record is loaded from the data root"
    )]
    taxpayer: Option<String>,
    #[arg(
        short = 'r',
        long = "record",
        value_name = "json_file",
        help = "Path to a taxpayer record in the JSON format"
    )]
    record_path: Option<PathBuf>,
    #[arg(
        short = 'f',
        long = "forms",
        value_delimiter = ',',
        default_value = "HAD,HR,PU,HLP,HLA",
        help = "The forms to render, in order"
    )]
    forms: Vec<FormCode>,
    #[arg(short = 'j', long = "jurisdiction")]
    jurisdiction: String,
    #[arg(short = 'p', long = "period", help = "Fiscal period of the templates")]
    period: String,
    #[arg(
        short = 'c',
        long = "config",
        value_name = "json_file",
        help = "Configuration file, the environment is read when it is absent"
    )]
    configuration_path: Option<PathBuf>,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "file_path",
        required_unless_present = "data_uri",
        conflicts_with = "data_uri"
    )]
    output_file_path: Option<PathBuf>,
    #[arg(long = "data-uri", help = "Print the document as a data URI instead of saving it")]
    data_uri: bool,
    #[arg(
        long = "properties",
        value_delimiter = ',',
        help = "Restrict the per-property forms to these property codes"
    )]
    properties: Option<Vec<String>>,
    #[arg(long = "preload", help = "Retrieve the templates of every form before generating")]
    preload: bool,
    #[arg(long = "log-level", default_value = "info")]
    log_level: log::LevelFilter,
}

#[tokio::main]
async fn main() {
    if let Err(error) = fallible_main().await {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

async fn fallible_main() -> Result<(), ContextError> {
    let arguments = CliArguments::parse();
    env_logger::builder()
        .filter_level(arguments.log_level)
        .init();
    log::debug!("{:?}", arguments);

    let configuration = match &arguments.configuration_path {
        Some(configuration_path) => Configuration::from_path(configuration_path)?,
        None => Configuration::from_env()?,
    };
    log::debug!("{:?}", configuration);

    let record = load_record(&arguments, &configuration).await?;

    let resource_transport =
        transport_for_root(&configuration.resource_root, &configuration.user_agent).map_err(
            |error| ContextError::with_error("Failed to set up the template retrieval", &error),
        )?;
    let resources = Arc::new(ResourceCache::new(
        resource_transport,
        configuration.miss_policy,
    ));
    if arguments.preload {
        let found = resources
            .preload(&arguments.jurisdiction, &arguments.period)
            .await;
        log::info!(
            "Preloaded {} of {} templates",
            found,
            FormCode::ALL.len()
        );
    }

    let assembler = DocumentAssembler::new(
        resources,
        PageSettings::default(),
        configuration.number_locale,
    );
    let request = FormRequest::new(arguments.forms.clone()).with_properties(
        match &arguments.properties {
            Some(property_codes) => PropertySelection::Only(property_codes.clone()),
            None => PropertySelection::All,
        },
    );
    let target = match &arguments.output_file_path {
        Some(output_file_path) => OutputTarget::File(output_file_path.clone()),
        None => OutputTarget::DataUri,
    };

    let output = assembler
        .generate_to(
            &request,
            &record,
            &arguments.jurisdiction,
            &arguments.period,
            target,
        )
        .await
        .map_err(|error| ContextError::with_error("Failed to generate the document", &error))?;
    if let GenerationOutput::DataUri(data_uri) = output {
        println!("{}", data_uri);
    }

    Ok(())
}

async fn load_record(
    arguments: &CliArguments,
    configuration: &Configuration,
) -> Result<TaxpayerRecord, ContextError> {
    if let Some(record_path) = &arguments.record_path {
        let record_contents = std::fs::read_to_string(record_path).map_err(|error| {
            ContextError::with_error("Failed to read the taxpayer record", &error)
        })?;
        return serde_json::from_str(&record_contents).map_err(|error| {
            ContextError::with_error("Failed to parse the taxpayer record", &error)
        });
    }

    let taxpayer = arguments.taxpayer.as_deref().ok_or_else(|| {
        ContextError::with_context("Either a taxpayer identifier or a record file is required")
    })?;
    let data_transport = transport_for_root(configuration.data_root(), &configuration.user_agent)
        .map_err(|error| ContextError::with_error("Failed to set up the record retrieval", &error))?;
    let loader = TaxpayerDataLoader::with_record_directory(
        data_transport,
        configuration.record_directory.clone(),
    );
    let record = loader
        .fetch(taxpayer)
        .await
        .map_err(|error| ContextError::with_error("Failed to load the taxpayer record", &*error))?;

    Ok(record.as_ref().clone())
}
