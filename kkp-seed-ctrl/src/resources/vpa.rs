use kkp_api::autoscaling::*;
use kkp_core::prelude::*;
use kkp_core::reconciling::NamedCreator;

use super::{
    TemplateData,
    base_meta,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VpaTargetKind {
    Deployment,
    StatefulSet,
}

impl VpaTargetKind {
    fn as_str(&self) -> &'static str {
        match self {
            VpaTargetKind::Deployment => "Deployment",
            VpaTargetKind::StatefulSet => "StatefulSet",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VpaTarget {
    pub kind: VpaTargetKind,
    pub name: String,
}

// Without the VPA feature gate the autoscalers only produce recommendations
pub fn update_mode(data: &TemplateData) -> VerticalPodAutoscalerUpdateMode {
    if data.config().feature_gates.vpa {
        VerticalPodAutoscalerUpdateMode::Auto
    } else {
        VerticalPodAutoscalerUpdateMode::Off
    }
}

pub fn vertical_pod_autoscaler<'a>(
    data: &'a TemplateData<'a>,
    target: VpaTarget,
) -> NamedCreator<'a, VerticalPodAutoscaler> {
    let name = target.name.clone();
    NamedCreator::new(&name, move |mut vpa: VerticalPodAutoscaler| {
        base_meta(data, &mut vpa.metadata, &target.name);
        vpa.spec.target_ref = CrossVersionObjectReference {
            api_version: "apps/v1".into(),
            kind: target.kind.as_str().into(),
            name: target.name.clone(),
        };
        vpa.spec.update_policy = Some(VerticalPodAutoscalerUpdatePolicy { update_mode: Some(update_mode(data)) });
        Ok(vpa)
    })
}
