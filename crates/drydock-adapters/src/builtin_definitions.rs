//! Built-in definitions.
//!
//! This module provides [`all_definitions`], the component and trait types
//! that ship with drydock and resolve from the system namespace. A
//! definitions directory given on the command line shadows these by name.
//!
//! # Shipped types
//!
//! | Kind      | Name         | Renders                                   |
//! |-----------|--------------|-------------------------------------------|
//! | component | `webservice` | `Deployment` exposing one container port  |
//! | component | `worker`     | `Deployment` without ports                |
//! | component | `task`       | `Job` running to completion               |
//! | trait     | `ingress`    | `Service` + `Ingress` outputs             |
//! | trait     | `sidecar`    | patch adding a container                  |
//! | trait     | `scaler`     | patch setting `spec.replicas`             |
//! | trait     | `labels`     | patch merging workload labels             |

use serde_json::Value;
use tracing::{debug, instrument};

use drydock_core::domain::{Definition, DomainError, SYSTEM_NAMESPACE};

/// Parse every built-in definition.
///
/// # Errors
///
/// Returns [`DomainError::InvalidDefinition`] if a built-in manifest is
/// malformed, which is a packaging bug.
#[instrument]
pub fn all_definitions() -> Result<Vec<Definition>, DomainError> {
    let definitions = MANIFESTS
        .iter()
        .map(|source| parse(source))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(count = definitions.len(), "Built-in definitions parsed");
    Ok(definitions)
}

fn parse(source: &str) -> Result<Definition, DomainError> {
    let document: Value =
        serde_yaml::from_str(source).map_err(|e| DomainError::InvalidDefinition {
            name: "<builtin>".into(),
            reason: e.to_string(),
        })?;
    Definition::from_manifest(&document, SYSTEM_NAMESPACE)
}

const MANIFESTS: &[&str] = &[WEBSERVICE, WORKER, TASK, INGRESS, SIDECAR, SCALER, LABELS];

const WEBSERVICE: &str = r#"
apiVersion: core.oam.dev/v1beta1
kind: ComponentDefinition
metadata:
  name: webservice
  annotations:
    definition.oam.dev/description: "Describes long-running, scalable, containerized services that have a stable network endpoint to receive external network traffic from customers."
spec:
  workload:
    definition:
      apiVersion: apps/v1
      kind: Deployment
  schematic:
    cue:
      template: |
        output: {
            apiVersion: "apps/v1"
            kind:       "Deployment"
            spec: {
                selector: matchLabels: "app.oam.dev/component": context.name
                template: {
                    metadata: labels: "app.oam.dev/component": context.name
                    spec: containers: [{
                        name:  context.name
                        image: parameter.image

                        if parameter["cmd"] != _|_ {
                            command: parameter.cmd
                        }
                        if parameter["env"] != _|_ {
                            env: parameter.env
                        }
                        ports: [{
                            containerPort: parameter.port
                        }]
                        if parameter["cpu"] != _|_ {
                            resources: {
                                limits: cpu:   parameter.cpu
                                requests: cpu: parameter.cpu
                            }
                        }
                    }]
                }
            }
        }
        parameter: {
            // +usage=Which image would you like to use for your service
            // +short=i
            image: string

            // +usage=Commands to run in the container
            cmd?: [...string]

            // +usage=Which port do you want customer traffic sent to
            // +short=p
            port: *80 | int

            // +usage=Define arguments by using environment variables
            env?: [...{
                name:   string
                value?: string
            }]

            // +usage=Number of CPU units for the service, like `0.5` (0.5 CPU core), `1` (1 CPU core)
            cpu?: string
        }
"#;

const WORKER: &str = r#"
apiVersion: core.oam.dev/v1beta1
kind: ComponentDefinition
metadata:
  name: worker
  annotations:
    definition.oam.dev/description: "Describes long-running, scalable, containerized services that running at backend. They do NOT have network endpoint to receive external network traffic."
spec:
  workload:
    definition:
      apiVersion: apps/v1
      kind: Deployment
  schematic:
    cue:
      template: |
        output: {
            apiVersion: "apps/v1"
            kind:       "Deployment"
            spec: {
                selector: matchLabels: "app.oam.dev/component": context.name
                template: {
                    metadata: labels: "app.oam.dev/component": context.name
                    spec: containers: [{
                        name:  context.name
                        image: parameter.image

                        if parameter["cmd"] != _|_ {
                            command: parameter.cmd
                        }
                    }]
                }
            }
        }
        parameter: {
            // +usage=Which image would you like to use for your service
            // +short=i
            image: string

            // +usage=Commands to run in the container
            cmd?: [...string]
        }
"#;

const TASK: &str = r#"
apiVersion: core.oam.dev/v1beta1
kind: ComponentDefinition
metadata:
  name: task
  annotations:
    definition.oam.dev/description: "Describes jobs that run code or a script to completion."
spec:
  workload:
    definition:
      apiVersion: batch/v1
      kind: Job
  schematic:
    cue:
      template: |
        output: {
            apiVersion: "batch/v1"
            kind:       "Job"
            spec: {
                parallelism: parameter.count
                completions: parameter.count
                template: spec: {
                    restartPolicy: parameter.restart
                    containers: [{
                        name:  context.name
                        image: parameter.image

                        if parameter["cmd"] != _|_ {
                            command: parameter.cmd
                        }
                    }]
                }
            }
        }
        parameter: {
            // +usage=Specify number of tasks to run in parallel
            // +short=c
            count: *1 | int

            // +usage=Which image would you like to use for your service
            // +short=i
            image: string

            // +usage=Define the job restart policy, the value can only be Never or OnFailure. By default, it's Never.
            restart: *"Never" | string

            // +usage=Commands to run in the container
            cmd?: [...string]
        }
"#;

const INGRESS: &str = r#"
apiVersion: core.oam.dev/v1beta1
kind: TraitDefinition
metadata:
  name: ingress
  annotations:
    definition.oam.dev/description: "Enable public web traffic for the component."
spec:
  appliesToWorkloads:
    - webservice
    - worker
  podDisruptive: false
  schematic:
    cue:
      template: |
        outputs: service: {
            apiVersion: "v1"
            kind:       "Service"
            metadata: name: context.name
            spec: {
                selector: "app.oam.dev/component": context.name
                ports: [
                    for k, v in parameter.http {
                        port:       v
                        targetPort: v
                    },
                ]
            }
        }

        outputs: ingress: {
            apiVersion: "networking.k8s.io/v1beta1"
            kind:       "Ingress"
            metadata: name: context.name
            spec: rules: [{
                host: parameter.domain
                http: paths: [
                    for k, v in parameter.http {
                        path: k
                        backend: {
                            serviceName: context.name
                            servicePort: v
                        }
                    },
                ]
            }]
        }

        parameter: {
            // +usage=Specify the domain you want to expose
            domain: string

            // +usage=Specify the mapping relationship between the http path and the workload port
            http: [string]: int
        }
"#;

const SIDECAR: &str = r#"
apiVersion: core.oam.dev/v1beta1
kind: TraitDefinition
metadata:
  name: sidecar
  annotations:
    definition.oam.dev/description: "Inject a sidecar container to the component."
spec:
  appliesToWorkloads:
    - webservice
    - worker
  podDisruptive: true
  schematic:
    cue:
      template: |
        patch: {
            // +patchKey=name
            spec: template: spec: containers: [{
                name:  parameter.name
                image: parameter.image
                if parameter["cmd"] != _|_ {
                    command: parameter.cmd
                }
            }]
        }
        parameter: {
            // +usage=Specify the name of sidecar container
            name: string

            // +usage=Specify the image of sidecar container
            image: string

            // +usage=Specify the commands run in the sidecar
            cmd?: [...string]
        }
"#;

const SCALER: &str = r#"
apiVersion: core.oam.dev/v1beta1
kind: TraitDefinition
metadata:
  name: scaler
  annotations:
    definition.oam.dev/description: "Manually scale K8s pod for your workload which follows the pod spec in path 'spec.template'."
spec:
  appliesToWorkloads:
    - webservice
    - worker
  podDisruptive: false
  schematic:
    cue:
      template: |
        patch: spec: replicas: parameter.replicas
        parameter: {
            // +usage=Specify the number of workload
            replicas: *1 | int
        }
"#;

const LABELS: &str = r#"
apiVersion: core.oam.dev/v1beta1
kind: TraitDefinition
metadata:
  name: labels
  annotations:
    definition.oam.dev/description: "Add labels on your workload."
spec:
  podDisruptive: true
  schematic:
    cue:
      template: |
        patch: spec: template: metadata: labels: {
            for k, v in parameter {
                "\(k)": v
            }
        }
        parameter: [string]: string
"#;
