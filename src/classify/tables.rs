//! Static message-canonicalization tables, one per resource kind.
//!
//! Each entry maps a message pattern to the canonical label recorded as a
//! metric value. Tables are ordered: when two patterns could match the
//! same message, the first-declared entry wins. The data here is a
//! swappable asset; the matching engine lives in the parent module.

pub const POD: &[(&str, &str)] = &[
    ("Successfully pulled image .*", "Successfully pulled image"),
    ("Pulling image .*", "Pulling image"),
    ("Failed to pull image .*", "Failed to pull image"),
    ("Back-off pulling image .*", "Back-off pulling image"),
    ("(Created|Started) container .*", "Created or started container"),
    ("Stopping container .*", "Stopping container"),
    ("Killing container .*", "Killing container"),
    (
        "Back-off restarting failed container.*",
        "Back-off restarting failed container",
    ),
    ("Container .* failed liveness probe, will be restarted", "Container failed liveness probe, will be restarted"),
    ("Readiness probe failed:.*", "Readiness probe failed"),
    ("Liveness probe failed:.*", "Liveness probe failed"),
    ("Startup probe failed:.*", "Startup probe failed"),
    ("Successfully assigned .* to .*", "Successfully assigned pod to node"),
    ("0/\\d+ nodes are available:.*", "No nodes are available to schedule pod"),
    (
        "Unable to attach or mount volumes:.*",
        "Unable to attach or mount volumes",
    ),
    (
        "MountVolume.SetUp failed for volume.*",
        "MountVolume.SetUp failed for volume",
    ),
    (
        "AttachVolume.Attach failed for volume.*",
        "AttachVolume.Attach failed for volume",
    ),
    ("Error: ErrImagePull", "ErrImagePull"),
    ("Error: ImagePullBackOff", "ImagePullBackOff"),
];

pub const POD_DISRUPTION_BUDGET: &[(&str, &str)] = &[
    ("No matching pods found", "No matching pods found"),
    (
        "Failed to calculate the number of expected pods:.*",
        "Failed to calculate the number of expected pods",
    ),
    ("found no controllers for pod.*", "Found no controllers for pod"),
];

pub const DAEMON_SET: &[(&str, &str)] = &[
    ("Created pod.*", "Created pod"),
    ("Error creating: pods .* forbidden.*", "Error creating pods - forbidden"),
    (
        "Found failed daemon pod .* on node .*, will try to kill it",
        "Found failed daemon pod on node, will try to kill it",
    ),
    (
        "Found succeeded daemon pod .* on node .*, will try to delete it",
        "Found succeeded daemon pod on node, will try to delete it",
    ),
];

pub const REPLICA_SET: &[(&str, &str)] = &[
    ("Deleted pod: .*", "Deleted pod"),
    ("Created pod: .*", "Created pod"),
    ("Error deleting: .*", "Error deleting"),
    ("Error creating: pods .*forbidden.*", "Error creating: forbidden"),
    ("Error creating: .*", "Error creating"),
];

pub const DEPLOYMENT: &[(&str, &str)] = &[
    ("Scaled down replica set .* to \\d+.*", "Scaled down replica set"),
    ("Scaled up replica set .* to \\d+.*", "Scaled up replica set"),
    (
        "The rollback revision contains the same template as current deployment .*",
        "The rollback revision contains the same template as current deployment",
    ),
    (
        "Rolled back deployment .* to revision .*",
        "Rolled back deployment to previous revision",
    ),
    ("Failed to create new replica set .*", "Failed to create new replica set"),
];

pub const DEPLOYMENT_CONFIG: &[(&str, &str)] = &[
    ("Rollout for .* cancelled", "Rollout cancelled"),
    (
        "Created new replication controller.*",
        "Created new replication controller",
    ),
    ("Cancelled deployment.*", "Cancelled deployment"),
    (
        "Deployment of version \\d+ awaiting cancellation of older running deployments",
        "Deployment awaiting cancellation of older running deployments",
    ),
];

pub const GRAFANA_DASHBOARD: &[(&str, &str)] = &[(
    "dashboard .* successfully submitted",
    "dashboard successfully submitted",
)];

pub const PERSISTENT_VOLUME_CLAIM: &[(&str, &str)] = &[
    ("storageclass.storage.k8s.io .* not found", "storageclass not found"),
    (
        "External provisioner is provisioning volume for claim .*",
        "External provisioner is provisioning volume for claim",
    ),
    ("Waiting for a volume to be created.*", "Waiting for a volume to be created"),
    ("Successfully provisioned volume.* using.*", "Successfully provisioned volume using plugin"),
    ("Successfully provisioned volume .*", "Successfully provisioned volume"),
    (
        ".*CSI migration enabled for .*; waiting for external resizer to expand the pvc.*",
        "CSI migration enabled for plugin; waiting for external resizer to expand the pvc",
    ),
    (
        ".*error getting CSI driver name for pvc .*, with error.*",
        "Error getting CSI driver name for pvc",
    ),
    (
        ".*error setting resizer annotation to pvc .*, with error.*",
        "Error setting resizer annotation to pvc",
    ),
    (".*waiting for pod.* to be scheduled", "Waiting for pods to be scheduled"),
    ("Cannot bind to requested volume.*", "Cannot bind to requested volume"),
    (
        ".*volume.* already bound to a different claim.*",
        "Volume already bound to a different claim",
    ),
    (
        "Cannot bind PersistentVolume.* to requested PersistentVolumeClaim due to incompatible volumeMode.",
        "Cannot bind PersistentVolume to requested PersistentVolumeClaim due to incompatible volumeMode.",
    ),
    (
        ".*plugin .* is not a CSI plugin. Only CSI plugin can provision a claim with a datasource",
        "Plugin is not a CSI plugin",
    ),
    (
        "Mount options are not supported by the provisioner but StorageClass .* has mount options .*",
        "Mount options are not supported by the provisioner but StorageClass has mount options",
    ),
    ("Failed to create provisioner.*", "Failed to create provisioner"),
    ("Failed to get target node.*", "Failed to get target node"),
    (
        "Failed to provision volume with StorageClass.*",
        "Failed to provision volume with StorageClass",
    ),
    (
        "Error creating provisioned PV object for claim .* Deleting the volume.",
        "Error creating provisioned PV object for claim. Deleting the volume.",
    ),
    (
        "Error cleaning provisioned volume for claim.* Please delete manually.",
        "Error cleaning provisioned volume for claim. Please delete manually.",
    ),
    (
        ".*error getting CSI name for In tree plugin.*",
        "Error getting CSI name for In tree plugin",
    ),
    ("Error saving claim.*", "Error saving claim"),
];

pub const PERSISTENT_VOLUME: &[(&str, &str)] = &[
    (
        "Cannot bind PersistentVolume to requested PersistentVolumeClaim .* due to incompatible volumeMode.",
        "Cannot bind PersistentVolume to requested PersistentVolumeClaim due to incompatible volumeMode.",
    ),
    ("Recycle failed.*", "Recycle of volume failed"),
    ("Volume is used by pods.*", "Volume is used by pods"),
    (".*failed to create deleter for volume.*", "Failed to create deleter for volume"),
    (
        ".*persistent volume controller can't update finalizer.*",
        "Persistent volume controller can't update finalizer",
    ),
    (
        ".*persistent Volume Controller can't anneal migration finalizer.*",
        "Persistent Volume Controller can't anneal migration finalizer",
    ),
    (
        ".*error getting deleter volume plugin for volume.*",
        "Error getting deleter volume plugin for volume",
    ),
    ("Recycler pod: .*", "Recycler pod"),
    (
        "rpc error: .* failed with error Bad request with.*",
        "Rpc error: failed with error Bad request",
    ),
    (
        "persistentvolume .* is still attached to node.*",
        "PersistentVolume is still attached to node",
    ),
];

pub const HORIZONTAL_POD_AUTOSCALER: &[(&str, &str)] = &[
    (
        ".*couldn't convert selector into a corresponding internal selector object.*",
        "Couldn't convert selector",
    ),
    (
        ".*pods by selector .* are controlled by multiple HPAs.*",
        "Pods are controlled by multiple HPAs",
    ),
    ("New size: \\d+; reason: .*", "New size"),
];

pub const NODE: &[(&str, &str)] = &[
    (".*The node was low on resource.*", "The node was low on resource"),
    (
        "Failed to update Node Allocatable Limits.*",
        "Failed to update Node Allocatable Limits",
    ),
    (
        "Failed to enforce System Reserved Cgroup Limits on.*",
        "Failed to enforce System Reserved Cgroup Limits",
    ),
    (
        "Failed to enforce Kube Reserved Cgroup Limits on .*",
        "Failed to enforce Kube Reserved Cgroup Limits",
    ),
    (
        "Resolv.conf file .* contains search line consisting of more than \\d+ domains!",
        "Resolv.conf file contains search line consisting of more than domain count limit!",
    ),
    (
        "Resolv.conf file .* contains a search path which length is more than allowed \\d+ chars!",
        "Resolv.conf file contains a search path which length is more than allowed subdomain length!",
    ),
    (
        "Resolv.conf file .* contains search line which length is more than allowed \\d+ chars!",
        "Resolv.conf file contains search line which length is more than max number of characters in the search path",
    ),
];

pub const STATEFUL_SET: &[(&str, &str)] = &[
    ("delete Pod .* failed error.*", "Delete Pod error"),
    ("delete Pod .* successful", "Delete Pod successful"),
    (
        "create Pod .* in StatefulSet .* failed error: Pod .* is invalid.*",
        "Pod configuration is invalid",
    ),
    (
        "create Pod .* in StatefulSet .* failed error: pods .* forbidden.*",
        "Pod is forbidden",
    ),
    ("create Pod .* successful", "Create Pod successful"),
    (
        "StatefulSet .* is recreating failed Pod .*",
        "StatefulSet is recreating failed Pod",
    ),
    (
        "StatefulSet .* is recreating terminated Pod .*",
        "StatefulSet is recreating terminated Pod",
    ),
    (
        "PersistentVolumeClaim .* has a conflicting OwnerReference that acts as a manging controller, the retention policy is ignored for this claim.*",
        "PersistentVolumeClaim has a conflicting OwnerReference",
    ),
    (
        ".*create Claim .* Pod .* in StatefulSet .* success.*",
        "Create Claim for Pod in StatefulSet success",
    ),
    (
        ".*create Claim .* for Pod .* in StatefulSet .* failed error.*",
        "Create Claim for Pod in StatefulSet failed error",
    ),
];

pub const ISSUER: &[(&str, &str)] = &[
    ("Failed to update ACME account.*", "Failed to update ACME account"),
    ("Error initializing issuer.*", "Error initializing issuer"),
    (
        "Failed to parse existing ACME server URI.*",
        "Failed to parse existing ACME server URI",
    ),
    (
        "Failed to parse existing ACME account URI.*",
        "Failed to parse existing ACME account URI",
    ),
    ("Failed to register ACME account.*", "Failed to register ACME account"),
];

pub const CHALLENGE: &[(&str, &str)] = &[
    ("Error cleaning up challenge:.*", "Error cleaning up challenge"),
    ("Error presenting challenge:.*", "Error presenting challenge"),
    (
        "Presented challenge using .* challenge mechanism.*",
        "Presented challenge using acme challenge mechanism",
    ),
    ("Domain .* verified with .* validation", "Domain verified with validation"),
    (
        "Accepting challenge authorization failed:.*",
        "Accepting challenge authorization failed",
    ),
];

pub const ORDER: &[(&str, &str)] = &[
    (
        "Failed to determine a valid solver configuration for the set of domains on the Order:.*",
        "Failed to determine the list of Challenge resources needed for the Order",
    ),
    (
        "Created Challenge resource .* for domain .*",
        "Created Challenge resource for domain",
    ),
];

pub const CERTIFICATE: &[(&str, &str)] = &[
    (
        "The certificate request has failed to complete and will be retried.*",
        "The certificate request has failed to complete and will be retried",
    ),
    (
        "Regenerating private key due to change in fields: .*",
        "Regenerating private key due to change in fields",
    ),
    (
        "Failed to decode private key stored in Secret .* - generating new key.*",
        "Failed to decode private key stored in Secret - generating new key",
    ),
    (
        "User intervention required: existing private key in Secret .* does not match requirements on Certificate resource.*",
        "User intervention required: existing private key in Secret does not match requirements on Certificate resource",
    ),
    (
        "Reusing private key stored in existing Secret resource.*",
        "Reusing private key stored in existing Secret resource",
    ),
    (
        "Stored new private key in temporary Secret resource.*",
        "Stored new private key in temporary Secret resource",
    ),
    ("Failed to create CertificateRequest:.*", "Failed to create CertificateRequest"),
    (
        "Created new CertificateRequest resource.*",
        "Created new CertificateRequest resource",
    ),
    (
        "Issuing certificate as Secret contains invalid private key data.*",
        "Issuing certificate as Secret contains invalid private key data",
    ),
    (
        "Issuing certificate as Secret contains an invalid certificate.*",
        "Issuing certificate as Secret contains an invalid certificate",
    ),
    ("Secret contains an invalid key-pair.*", "Secret contains an invalid key-pair"),
    (
        "Existing private key is not up to date for spec.*",
        "Existing private key is not up to date for spec",
    ),
    (
        "Issuing certificate as Secret was previously issued by.*",
        "Issuing certificate as Secret was previously issued",
    ),
    (
        "Secret was issued for .*. If this message is not transient, you might have two conflicting Certificates pointing to the same secret.*",
        "Secret was issued for another certificate",
    ),
];

pub const CERTIFICATE_SIGNING_REQUEST: &[(&str, &str)] = &[
    (
        "Failed to decode CSR in spec.request:.*",
        "Failed to decode CSR in spec.request",
    ),
    (
        "The CSR PEM requests a commonName that is not present in the list of dnsNames or ipAddresses.*",
        "The CSR PEM requests a commonName that is not present in the list of dnsNames or ipAddresses",
    ),
    ("Failed to build order.*", "Failed to build order"),
    ("Created Order resource.*", "Created Order resource"),
    (
        "Failed to wait for order resource .* to become ready.*",
        "Failed to wait for order resource to become ready",
    ),
    (
        "Waiting on certificate issuance from order.*",
        "Waiting on certificate issuance from order",
    ),
    (
        "Waiting for order-controller to add certificate data to Order.*",
        "Waiting for order-controller to add certificate data to Order resource",
    ),
    (
        "Deleting Order with bad certificate.*",
        "Deleting Order with bad certificate",
    ),
    ("Error updating certificate.*", "Error updating certificate"),
    ("Referenced [Ss]ecret .* not found.*", "Referenced secret not found"),
    (
        "Failed to parse signing CA keypair from secret.*",
        "Failed to parse signing CA keypair from secret",
    ),
    (
        "Failed to get certificate key pair from secret.*",
        "Failed to get certificate key pair from secret",
    ),
    (
        "Error generating certificate template.*",
        "Error generating certificate template",
    ),
    ("Error signing certificate.*", "Error signing certificate"),
    (
        "Missing private key reference annotation.*",
        "Missing private key reference annotation",
    ),
    (
        "Failed to parse signing key from secret.*",
        "Failed to parse signing key from secret",
    ),
    (
        "Failed to get certificate CA key from secret.*",
        "Failed to get certificate CA key from secret",
    ),
    ("Referenced.* is missing type", "Referenced issuer is missing type"),
    (
        "Referenced.* does not have a Ready status condition",
        "Referenced issuer does not have a Ready status condition",
    ),
    ("Referenced.* not found", "Referenced issuer not found"),
    (
        "Requester may not reference Namespaced Issuer.*",
        "Requester may not reference Namespaced Issuer",
    ),
    ("Failed to parse requested duration.*", "Failed to parse requested duration"),
    (
        "CertificateSigningRequest minimum allowed duration is.*",
        "CertificateSigningRequest duration is smaller than minimum allowed",
    ),
    (
        "Failed to parse returned certificate bundle.*",
        "Failed to parse returned certificate bundle",
    ),
    (
        "Failed to initialise vault client for signing.*",
        "Failed to initialise vault client for signing",
    ),
    ("Vault failed to sign.*", "Vault failed to sign"),
    (
        "Failed to initialise venafi client for signing.*",
        "Failed to initialise venafi client for signing",
    ),
    ("Failed to parse .* annotation.*", "Failed to parse venafi annotation"),
    (
        "Failed to request venafi certificate.*",
        "Failed to request venafi certificate",
    ),
    (
        "Failed to obtain venafi certificate.*",
        "Failed to obtain venafi certificate",
    ),
    ("CSR .* has been approved", "CSR has been approved"),
];

pub const SERVICE: &[(&str, &str)] = &[
    ("Error listing Pods for Service.*", "Error listing Pods for Service"),
    (
        "Error listing Endpoint Slices for Service.*",
        "Error listing Endpoint Slices for Service",
    ),
    (
        "Error updating Endpoint Slices for Service.*",
        "Error updating Endpoint Slices for Service",
    ),
    (
        "failed to check if load balancer exists before cleanup.*",
        "failed to check if load balancer exists before cleanup",
    ),
    ("failed to delete load balancer.*", "failed to delete load balancer"),
    (
        "failed to remove load balancer cleanup finalizer.*",
        "failed to remove load balancer cleanup finalizer",
    ),
    (
        "failed to add load balancer cleanup finalizer.*",
        "failed to add load balancer cleanup finalizer",
    ),
    ("failed to ensure load balancer.*", "failed to ensure load balancer"),
    (
        "failed to update load balancer status.*",
        "failed to update load balancer status",
    ),
    (
        "Error updating load balancer with new hosts.*",
        "Error updating load balancer with new hosts",
    ),
    ("Error deleting load balancer.*", "Error deleting load balancer"),
];

pub const ENDPOINTS: &[(&str, &str)] = &[
    (
        "Failed to create endpoint for service.*",
        "Failed to create endpoint for service",
    ),
    ("Failed to update endpoint.*", "Failed to update endpoint"),
    (
        "Skipped \\d+ invalid IP addresses when mirroring to EndpointSlices",
        "Skipped invalid IP addresses when mirroring to EndpointSlices",
    ),
    (
        "A max of \\d+ addresses can be mirrored to EndpointSlices per Endpoints subset. \\d+ addresses were skipped",
        "Addresses in Endpoints were skipped due to exceeding MaxEndpointsPerSubset",
    ),
];

pub const JOB: &[(&str, &str)] = &[
    ("Created pod: .*", "Created pod"),
    ("Deleted pod: .*", "Deleted pod"),
    ("Error deleting: .*", "Error deleting"),
    ("Error creating: .*forbidden.*", "Error creating: forbidden"),
    ("Error creating: .*", "Error creating"),
];

pub const CRON_JOB: &[(&str, &str)] = &[
    ("Created job.*", "Created job"),
    ("Deleted job.*", "Deleted job"),
    ("unparseable schedule for cronjob.*", "Unparseable schedule for cronjob"),
    (
        "Saw a job that the controller did not create or forgot.*",
        "Saw a job that the controller did not create or forgot",
    ),
    ("Saw completed job.*", "Saw completed job"),
    ("Active job went missing.*", "Active job went missing"),
    ("invalid timeZone.*", "Invalid timeZone"),
    ("unparseable schedule:.*", "Unparseable schedule"),
    ("invalid schedule:.*", "Invalid schedule"),
    (
        "Missed scheduled time to start a job.*",
        "Missed scheduled time to start a job",
    ),
    ("Get job.*", "Get job"),
    ("Error creating job:.*", "Error creating job"),
];
