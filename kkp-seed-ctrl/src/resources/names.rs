// Deployments
pub const APISERVER_DEPLOYMENT_NAME: &str = "apiserver";
pub const CONTROLLER_MANAGER_DEPLOYMENT_NAME: &str = "controller-manager";
pub const SCHEDULER_DEPLOYMENT_NAME: &str = "scheduler";
pub const MACHINE_CONTROLLER_DEPLOYMENT_NAME: &str = "machine-controller";
pub const MACHINE_CONTROLLER_WEBHOOK_DEPLOYMENT_NAME: &str = "machine-controller-webhook";
pub const METRICS_SERVER_DEPLOYMENT_NAME: &str = "metrics-server";
pub const OPENVPN_SERVER_DEPLOYMENT_NAME: &str = "openvpn-server";
pub const DNS_RESOLVER_DEPLOYMENT_NAME: &str = "dns-resolver";
pub const USER_CLUSTER_CONTROLLER_DEPLOYMENT_NAME: &str = "usercluster-controller";
pub const CLUSTER_AUTOSCALER_DEPLOYMENT_NAME: &str = "cluster-autoscaler";
pub const NODEPORT_PROXY_DEPLOYMENT_NAME: &str = "nodeport-proxy-envoy";

// StatefulSets and CronJobs
pub const ETCD_STATEFULSET_NAME: &str = "etcd";
pub const ETCD_DEFRAG_CRONJOB_NAME: &str = "etcd-defragger";

// Services
pub const APISERVER_INTERNAL_SERVICE_NAME: &str = "apiserver";
pub const APISERVER_EXTERNAL_SERVICE_NAME: &str = "apiserver-external";
pub const OPENVPN_SERVER_SERVICE_NAME: &str = "openvpn-server";
pub const ETCD_SERVICE_NAME: &str = "etcd";
pub const DNS_RESOLVER_SERVICE_NAME: &str = "dns-resolver";
pub const MACHINE_CONTROLLER_WEBHOOK_SERVICE_NAME: &str = "machine-controller-webhook";
pub const METRICS_SERVER_SERVICE_NAME: &str = "metrics-server";
pub const FRONT_LOADBALANCER_SERVICE_NAME: &str = "front-loadbalancer";

// Secrets
pub const ADMIN_KUBECONFIG_SECRET_NAME: &str = "admin-kubeconfig";
pub const INTERNAL_ADMIN_KUBECONFIG_SECRET_NAME: &str = "internal-admin-kubeconfig";
pub const SCHEDULER_KUBECONFIG_SECRET_NAME: &str = "scheduler-kubeconfig";
pub const KUBELET_DNAT_CONTROLLER_KUBECONFIG_SECRET_NAME: &str = "kubeletdnatcontroller-kubeconfig";
pub const KUBE_STATE_METRICS_KUBECONFIG_SECRET_NAME: &str = "kube-state-metrics-kubeconfig";
pub const METRICS_SERVER_KUBECONFIG_SECRET_NAME: &str = "metrics-server";
pub const CONTROLLER_MANAGER_KUBECONFIG_SECRET_NAME: &str = "controllermanager-kubeconfig";
pub const MACHINE_CONTROLLER_KUBECONFIG_SECRET_NAME: &str = "machinecontroller-kubeconfig";
pub const CLUSTER_AUTOSCALER_KUBECONFIG_SECRET_NAME: &str = "cluster-autoscaler-kubeconfig";
pub const IMAGE_PULL_SECRET_NAME: &str = "dockercfg";
pub const OPENSHIFT_IMAGE_PULL_SECRET_NAME: &str = "openshift-image-pull-secret";
pub const TOKENS_SECRET_NAME: &str = "tokens";
pub const DEX_CA_SECRET_NAME: &str = "dex-ca";
pub const GCP_SERVICE_ACCOUNT_SECRET_NAME: &str = "gcp-service-account";

// Secret keys
pub const KUBECONFIG_SECRET_KEY: &str = "kubeconfig";
pub const TOKEN_SECRET_KEY: &str = "token";
pub const TOKENS_FILE_NAME: &str = "tokens.csv";
pub const DEX_CA_FILE_NAME: &str = "caBundle.pem";
pub const GCP_SERVICE_ACCOUNT_KEY: &str = "serviceAccount";

// ConfigMaps
pub const CLOUD_CONFIG_CONFIGMAP_NAME: &str = "cloud-config";
pub const OPENVPN_CLIENT_CONFIGS_CONFIGMAP_NAME: &str = "openvpn-client-configs";
pub const DNS_RESOLVER_CONFIGMAP_NAME: &str = "dns-resolver";
pub const AUDIT_CONFIGMAP_NAME: &str = "audit-config";
pub const OPENSHIFT_APISERVER_CONFIGMAP_NAME: &str = "openshift-config-apiserver";

// PodDisruptionBudgets
pub const ETCD_PDB_NAME: &str = "etcd";
pub const APISERVER_PDB_NAME: &str = "apiserver";
pub const METRICS_SERVER_PDB_NAME: &str = "metrics-server";
pub const DNS_RESOLVER_PDB_NAME: &str = "dns-resolver";
pub const NODEPORT_PROXY_PDB_NAME: &str = "nodeport-proxy";

// RBAC
pub const USER_CLUSTER_CONTROLLER_RBAC_NAME: &str = "usercluster-controller";
pub const NODEPORT_PROXY_RBAC_NAME: &str = "nodeport-proxy";

// Usernames embedded in the generated kubeconfigs
pub const ADMIN_USERNAME: &str = "admin";
pub const INTERNAL_ADMIN_USERNAME: &str = "kubermatic-controllers";
pub const SCHEDULER_USERNAME: &str = "system:kube-scheduler";
pub const CONTROLLER_MANAGER_USERNAME: &str = "system:kube-controller-manager";
pub const MACHINE_CONTROLLER_USERNAME: &str = "machine-controller";
pub const KUBELET_DNAT_CONTROLLER_USERNAME: &str = "kubermatic:kubeletdnat-controller";
pub const KUBE_STATE_METRICS_USERNAME: &str = "kube-state-metrics";
pub const METRICS_SERVER_USERNAME: &str = "metrics-server";
pub const CLUSTER_AUTOSCALER_USERNAME: &str = "kubermatic:cluster-autoscaler";
